use std::time::Duration;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use crate::app::{Action, App};
use crate::models::UiEvent;
use crate::session::Controller;
use crate::ui;

pub struct Channels {
    pub events: mpsc::UnboundedReceiver<UiEvent>,
    pub requests: watch::Sender<String>,
}

pub async fn run(mut app: App, channels: Channels, controller: Controller, token: String) -> anyhow::Result<()> {
    // 1. Setup Terminal
    let mut terminal = ratatui::init();

    let result = event_loop(&mut terminal, &mut app, channels, &controller, &token).await;

    // 3. Restore Terminal
    ratatui::restore();
    result
}

// 2. The Game Loop
async fn event_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    mut channels: Channels,
    controller: &Controller,
    token: &str,
) -> anyhow::Result<()> {
    let mut input = EventStream::new();
    // Ages are relative to "now", redraw once a second.
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    while !app.should_quit {
        terminal.draw(|f| ui::render(f, app))?;

        tokio::select! {
            Some(event) = channels.events.recv() => app.apply(event),
            maybe = input.next() => match maybe {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key) {
                        Some(Action::ListNamespaces) => {
                            let controller = controller.clone();
                            let token = token.to_string();
                            tokio::spawn(async move { controller.load_namespaces(&token).await });
                        }
                        Some(Action::SwitchNamespace(namespace)) => {
                            debug!(%namespace, "namespace requested");
                            channels.requests.send_replace(namespace);
                        }
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
            _ = tick.tick() => {}
        }
    }
    Ok(())
}
