//! Core Logic Task Implementation

use imgate_core::{Command, CommandReceiver, Event, EventReceiver};
use tracing::{debug, info, warn};

use super::manager::AccountManager;

// ----------------------------------------------------------------------------
// Core Logic Task
// ----------------------------------------------------------------------------

/// Owns the account manager and serializes every command and event into it
pub struct CoreLogicTask {
    manager: AccountManager,
    /// Channel for receiving client commands
    command_receiver: CommandReceiver,
    /// Channel for receiving provider, timer and display events
    event_receiver: EventReceiver,
    running: bool,
}

impl CoreLogicTask {
    pub fn new(
        manager: AccountManager,
        command_receiver: CommandReceiver,
        event_receiver: EventReceiver,
    ) -> Self {
        Self {
            manager,
            command_receiver,
            event_receiver,
            running: true,
        }
    }

    /// Run until a `Shutdown` command arrives or every command sender is gone
    pub async fn run(&mut self) {
        info!("Core logic task starting");

        while self.running {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.process_command(command),
                        None => {
                            info!("Command channel closed, shutting down");
                            self.manager.shutdown();
                            self.running = false;
                        }
                    }
                }

                event = self.event_receiver.recv() => {
                    match event {
                        Some(event) => self.process_event(event),
                        None => {
                            // The manager's timers hold a sender, so this only
                            // happens once the manager itself is torn down
                            warn!("Event channel closed");
                            self.running = false;
                        }
                    }
                }
            }
        }

        info!("Core logic task stopped");
    }

    fn process_command(&mut self, command: Command) {
        debug!(command = command.name(), "Processing command");
        self.manager.record_command();

        let manager = &mut self.manager;
        match command {
            Command::Login { request, reply } => manager.attempt_login(request, reply),
            Command::Logout { request, reply } => manager.attempt_logout(request, reply),
            Command::SetMyAvailability { request, reply } => {
                manager.set_my_availability(request, reply)
            }
            Command::SetMyCustomMessage { request, reply } => {
                manager.set_my_custom_message(request, reply)
            }
            Command::SendMessage { request, reply } => manager.send_message(request, reply),
            Command::GetBuddyList { request, reply } => manager.get_buddy_list(request, reply),
            Command::RegisterForIncomingMessages { request, reply } => {
                manager.register_for_incoming_messages(request, reply)
            }
            Command::DeviceConnectionClosed { request, reply } => {
                manager.device_connection_closed(request, reply)
            }
            Command::EnablePresenceQueue { reply } => reply.send(manager.enable_presence_queue()),
            Command::DisablePresenceQueue { reply } => {
                reply.send(manager.disable_presence_queue())
            }
            Command::GetStatus { reply } => reply.send(manager.status()),
            Command::Shutdown => {
                manager.shutdown();
                self.running = false;
            }
        }
    }

    fn process_event(&mut self, event: Event) {
        debug!(?event, "Processing event");
        self.manager.handle_event(event);
    }
}
