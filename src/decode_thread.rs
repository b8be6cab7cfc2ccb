use std::sync::mpsc::{Receiver, SendError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info};

use crate::buffer::AudioBuffer;
use crate::decode::{DecodeError, DecodeService, SourceFormat};

/// Identifies one decode request, so stale results can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

/// Callback invoked on the decode thread whenever an outcome is ready, e.g. to wake up
/// the UI loop.
pub type Notifier = Box<dyn Fn() + Send>;

/// Commands to control the thread that performs decoding.
pub enum DecodeCommand {
    /// Decode `bytes` as `format` and report the outcome under `job`.
    Decode {
        job: JobId,
        bytes: Arc<[u8]>,
        format: SourceFormat,
    },
}

/// Result of one decode request.
#[derive(Debug)]
pub struct DecodeOutcome {
    pub job: JobId,
    pub result: Result<AudioBuffer, DecodeError>,
}

/// Struct that owns and controls a thread that decodes audio in the background.
pub struct DecodeThread {
    /// Handle to the decode thread.
    ///
    /// Handle is wrapped in [Option] for graceful joining, when [DecodeThread] is dropped.
    thread_handle: Option<JoinHandle<()>>,
    commands_sender: Option<Sender<DecodeCommand>>,
    outcomes_receiver: Receiver<DecodeOutcome>,
}

impl DecodeThread {
    /// Creates new [DecodeThread] object with a spawned decode thread.
    ///
    /// # Parameters
    ///
    /// * `service` - decoder used for every request.
    /// * `notifier` - called after each outcome is sent back.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be created.
    pub fn spawn(service: Box<dyn DecodeService>, notifier: Option<Notifier>) -> std::io::Result<Self> {
        let (commands_sender, commands_receiver) = std::sync::mpsc::channel();
        let (outcomes_sender, outcomes_receiver) = std::sync::mpsc::channel();

        let thread_ctx = ThreadContext {
            commands_receiver,
            outcomes_sender,
            service,
            notifier,
        };

        let thread_handle = std::thread::Builder::new()
            .name("decode".to_string())
            .spawn(move || decode_audio(thread_ctx))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            commands_sender: Some(commands_sender),
            outcomes_receiver,
        })
    }

    /// Sends a command to the decode thread.
    pub fn send(&self, command: DecodeCommand) -> Result<(), SendError<DecodeCommand>> {
        match self.commands_sender.as_ref() {
            Some(sender) => sender.send(command),
            None => Err(SendError(command)),
        }
    }

    /// Returns a finished outcome without blocking, if there is one.
    pub fn try_recv(&self) -> Option<DecodeOutcome> {
        match self.outcomes_receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the next outcome arrives. Returns [None] if the thread has exited.
    pub fn recv(&self) -> Option<DecodeOutcome> {
        self.outcomes_receiver.recv().ok()
    }
}

impl Drop for DecodeThread {
    fn drop(&mut self) {
        // Dropping the sender end of the channel tells the decode thread to stop once the
        // request it is working on (if any) is done. Its outcome goes nowhere.
        drop(self.commands_sender.take());

        if let Some(thread) = self.thread_handle.take() {
            if thread.join().is_err() {
                error!("decode thread panicked");
            }
        }
    }
}

/// Data owned by the decode thread.
struct ThreadContext {
    commands_receiver: Receiver<DecodeCommand>,
    outcomes_sender: Sender<DecodeOutcome>,
    service: Box<dyn DecodeService>,
    notifier: Option<Notifier>,
}

/// Entry point for the decode thread.
fn decode_audio(thread_ctx: ThreadContext) {
    // Decoding is the only slow step of the pipeline, and there is never more than one
    // request in flight, so a plain blocking loop is enough.
    while let Ok(command) = thread_ctx.commands_receiver.recv() {
        if !handle_command(&thread_ctx, command) {
            break;
        }
    }
    debug!("decode thread exiting");
}

/// Handles a single received command. Returns `false` once nobody listens for outcomes.
fn handle_command(thread_ctx: &ThreadContext, command: DecodeCommand) -> bool {
    match command {
        DecodeCommand::Decode { job, bytes, format } => {
            info!(job = job.0, %format, len = bytes.len(), "decoding");
            let result = thread_ctx.service.decode(bytes, format);
            if let Err(error) = &result {
                debug!(job = job.0, %error, "decode failed");
            }

            if thread_ctx
                .outcomes_sender
                .send(DecodeOutcome { job, result })
                .is_err()
            {
                return false;
            }
            if let Some(notify) = &thread_ctx.notifier {
                notify();
            }
            true
        }
    }
}
