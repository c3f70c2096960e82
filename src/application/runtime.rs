// Event loop - Single task that owns the mode controller
use crate::application::feed_adapter::TransportEvent;
use crate::application::mode_controller::ModeController;
use crate::domain::display::{ModeError, ModeRequest};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Upper bound on how long the loop sleeps with no timer attached.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub enum Command {
    Select {
        request: ModeRequest,
        reply: oneshot::Sender<Result<(), ModeError>>,
    },
    ReloadSettings,
}

/// Drive the controller until the command channel closes.
///
/// Feed events, timer ticks, commands and network completions are handled one
/// at a time, so no handler observes another one half done. Queued feed events
/// are drained before commands.
pub async fn run(
    mut controller: ModeController,
    mut feed_events: mpsc::Receiver<TransportEvent>,
    mut commands: mpsc::Receiver<Command>,
) {
    controller.start().await;

    loop {
        let wait = match controller.next_deadline() {
            Some(deadline) => {
                let millis = (deadline - controller.now()).max(0) as u64;
                Duration::from_millis(millis)
            }
            None => IDLE_WAIT,
        };

        tokio::select! {
            biased;
            Some(event) = feed_events.recv() => controller.on_transport_event(event),
            Some(completion) = controller.next_completion() => controller.on_completion(completion),
            command = commands.recv() => match command {
                Some(Command::Select { request, reply }) => {
                    let _ = reply.send(controller.select(request));
                }
                Some(Command::ReloadSettings) => controller.load_settings().await,
                None => break,
            },
            _ = tokio::time::sleep(wait) => controller.fire_due_timers(),
        }
    }

    controller.shutdown();
}
