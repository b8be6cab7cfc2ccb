//! Ownership of the encoded audio currently handed to playback.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::decode::SourceFormat;

/// Who created a resource and is therefore responsible for releasing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOrigin {
    /// Bytes of a file picked by the user. Owned by the upload side.
    Upload,
    /// Output of a trim. Owned by [ResourceLifecycle].
    Published,
}

#[derive(Debug)]
struct Resource {
    id: u64,
    name: String,
    format: SourceFormat,
    origin: ResourceOrigin,
    bytes: Arc<[u8]>,
    released: AtomicBool,
}

/// Cheap, clonable handle to an encoded audio resource.
///
/// Clones share the same resource. Releasing a handle marks it dead for every clone;
/// the bytes themselves stay alive until the last clone is dropped, so a decode that is
/// still reading them is never cut short.
#[derive(Debug, Clone)]
pub struct ResourceHandle(Arc<Resource>);

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn format(&self) -> SourceFormat {
        self.0.format
    }

    pub fn origin(&self) -> ResourceOrigin {
        self.0.origin
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    /// Shared bytes for handing to another thread.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.0.bytes)
    }

    pub fn is_released(&self) -> bool {
        self.0.released.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.0.released.store(true, Ordering::Release);
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ResourceHandle {}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{} ({})", self.0.id, self.0.name)
    }
}

/// Holds exactly one current resource and releases published ones when superseded.
#[derive(Debug, Default)]
pub struct ResourceLifecycle {
    current: Option<ResourceHandle>,
    next_id: u64,
}

impl ResourceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a freshly loaded file the current resource.
    pub fn adopt_upload(
        &mut self,
        name: impl Into<String>,
        format: SourceFormat,
        bytes: Arc<[u8]>,
    ) -> ResourceHandle {
        self.install(name.into(), format, ResourceOrigin::Upload, bytes)
    }

    /// Wraps the output of a trim as the new current resource.
    pub fn publish(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> ResourceHandle {
        self.install(
            name.into(),
            SourceFormat::Wav,
            ResourceOrigin::Published,
            bytes.into(),
        )
    }

    pub fn current(&self) -> Option<&ResourceHandle> {
        self.current.as_ref()
    }

    fn install(
        &mut self,
        name: String,
        format: SourceFormat,
        origin: ResourceOrigin,
        bytes: Arc<[u8]>,
    ) -> ResourceHandle {
        self.next_id += 1;
        let handle = ResourceHandle(Arc::new(Resource {
            id: self.next_id,
            name,
            format,
            origin,
            bytes,
            released: AtomicBool::new(false),
        }));

        if let Some(previous) = self.current.replace(handle.clone()) {
            Self::release_if_owned(&previous);
        }
        debug!(resource = %handle, ?origin, "resource is now current");
        handle
    }

    fn release_if_owned(handle: &ResourceHandle) {
        if handle.origin() == ResourceOrigin::Published {
            handle.release();
            debug!(resource = %handle, "released superseded resource");
        }
    }
}

impl Drop for ResourceLifecycle {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            Self::release_if_owned(&current);
        }
    }
}
