//! Render particle frames to the user's terminal

use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;

use termwiz::input::{InputEvent, KeyCode, KeyEvent, Modifiers};
use termwiz::surface::Change as TermwizChange;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};

use crate::run::FrameUpdate;
use crate::shared_state::SharedState;

/// How often to check for key presses and terminal resizes.
const INPUT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// `Render`
pub(crate) struct Renderer {
    /// Shared app state
    pub state: Arc<SharedState>,
    /// The terminal's width
    pub width: u16,
    /// The terminal's height
    pub height: u16,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal
    pub fn new(state: Arc<SharedState>) -> Result<Self> {
        let size = Self::get_users_tty_size()?;
        Ok(Self {
            state,
            width: size.cols.try_into()?,
            height: size.rows.try_into()?,
        })
    }

    /// Instantiate and run
    pub fn start(
        state: Arc<SharedState>,
        frames_rx: mpsc::Receiver<FrameUpdate>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = protocol_tx.subscribe();
        tokio::spawn(async move {
            match Self::new(Arc::clone(&state)) {
                Ok(mut renderer) => {
                    let result = renderer
                        .run(frames_rx, protocol_rx, protocol_tx.clone())
                        .await;

                    if let Err(error) = result {
                        crate::run::broadcast_protocol_end(&protocol_tx);
                        return Err(error);
                    };
                }
                Err(error) => {
                    crate::run::broadcast_protocol_end(&protocol_tx);
                    return Err(error);
                }
            };

            Ok(())
        })
    }

    /// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
    /// `BufferedTerminal::new()`
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Get the user's current terminal size and propogate it
    pub async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        users_terminal: &mut BufferedTerminal<T>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let is_resized = users_terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        users_terminal.repaint()?;

        let (width, height) = users_terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        tracing::debug!("User's terminal resized to {}x{}", self.width, self.height);
        self.state.set_tty_size(self.width, self.height).await;
        protocol_tx.send(crate::run::Protocol::Resize {
            width: self.width,
            height: self.height,
        })?;

        Ok(())
    }

    /// Put the terminal into a state where we own the whole screen, then render frames until
    /// we're told to stop. Whatever happens, the user's terminal is always put back the way it
    /// was.
    async fn run(
        &mut self,
        frames: mpsc::Receiver<FrameUpdate>,
        protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut users_terminal = Self::get_termwiz_terminal()?;
        users_terminal.set_raw_mode()?;
        users_terminal.enter_alternate_screen()?;
        let mut users_terminal = BufferedTerminal::new(users_terminal)?;
        users_terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Hidden,
        ));
        users_terminal.flush()?;

        let result = self
            .render_loop(&mut users_terminal, frames, protocol_rx, &protocol_tx)
            .await;

        tracing::debug!("Restoring user's terminal");
        let restored = Self::restore_terminal(&mut users_terminal);

        result.and(restored)
    }

    /// Put the user's terminal back the way it was. Every step is attempted even if an earlier one
    /// fails, a half restored terminal is much worse than an error message.
    fn restore_terminal<T: TermwizTerminal>(
        users_terminal: &mut BufferedTerminal<T>,
    ) -> Result<()> {
        users_terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Visible,
        ));
        let flushed = users_terminal.flush().map_err(color_eyre::eyre::Report::from);
        let exited = users_terminal
            .terminal()
            .exit_alternate_screen()
            .map_err(color_eyre::eyre::Report::from);
        let cooked = users_terminal
            .terminal()
            .set_cooked_mode()
            .map_err(color_eyre::eyre::Report::from);

        Self::first_error([flushed, exited, cooked])
    }

    /// Log every error but only return the first one.
    fn first_error(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
        let mut first = Ok(());
        for result in results {
            if let Err(error) = result {
                tracing::error!("Restoring user's terminal: {error:?}");
                if first.is_ok() {
                    first = Err(error);
                }
            }
        }
        first
    }

    /// Listen for frames, key presses and protocol messages.
    async fn render_loop<T: TermwizTerminal + Send>(
        &mut self,
        users_terminal: &mut BufferedTerminal<T>,
        mut frames: mpsc::Receiver<FrameUpdate>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let mut input_poll = tokio::time::interval(INPUT_POLL_INTERVAL);
        input_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::debug!("Starting render loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                Some(update) = frames.recv() => {
                    self.handle_resize(users_terminal, protocol_tx).await?;
                    self.render(&update, users_terminal)?;
                }
                _ = input_poll.tick() => {
                    self.handle_resize(users_terminal, protocol_tx).await?;
                    Self::handle_input(users_terminal, protocol_tx)?;
                }
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Exited render loop");

        Ok(())
    }

    /// Drain any pending input, quitting if asked to.
    fn handle_input(
        users_terminal: &mut BufferedTerminal<impl TermwizTerminal>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        while let Some(event) = users_terminal
            .terminal()
            .poll_input(Some(std::time::Duration::ZERO))?
        {
            if Self::is_quit(&event) {
                tracing::info!("User asked to quit");
                crate::run::broadcast_protocol_end(protocol_tx);
                break;
            }
        }

        Ok(())
    }

    /// "q", Escape or Ctrl-C.
    fn is_quit(event: &InputEvent) -> bool {
        #[expect(clippy::wildcard_enum_match_arm, reason = "We only care about keys")]
        match event {
            InputEvent::Key(KeyEvent {
                key: KeyCode::Char('q') | KeyCode::Escape,
                ..
            }) => true,
            InputEvent::Key(KeyEvent {
                key: KeyCode::Char('c'),
                modifiers,
            }) => modifiers.contains(Modifiers::CTRL),
            _ => false,
        }
    }

    /// Do a single render to the user's actual terminal. It uses a diffing algorithm to make
    /// the minimum number of changes.
    fn render(
        &self,
        update: &FrameUpdate,
        users_terminal: &mut BufferedTerminal<impl TermwizTerminal>,
    ) -> Result<()> {
        tracing::trace!("Rendering frame {}", update.sequence);
        let frame = crate::surface::Surface::from_canvas(
            &update.canvas,
            self.width.into(),
            self.height.into(),
        )?;
        users_terminal.draw_from_screen(&frame.surface, 0, 0);

        // This is where we actually render to the user's real terminal.
        users_terminal.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(key: KeyCode, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key(KeyEvent { key, modifiers })
    }

    #[test]
    fn quit_keys() {
        assert!(Renderer::is_quit(&key(KeyCode::Char('q'), Modifiers::NONE)));
        assert!(Renderer::is_quit(&key(KeyCode::Escape, Modifiers::NONE)));
        assert!(Renderer::is_quit(&key(KeyCode::Char('c'), Modifiers::CTRL)));
    }

    #[test]
    fn other_keys_are_ignored() {
        assert!(!Renderer::is_quit(&key(KeyCode::Char('c'), Modifiers::NONE)));
        assert!(!Renderer::is_quit(&key(KeyCode::Char('x'), Modifiers::NONE)));
        assert!(!Renderer::is_quit(&key(KeyCode::Enter, Modifiers::NONE)));
        assert!(!Renderer::is_quit(&InputEvent::Resized { cols: 1, rows: 1 }));
    }

    #[test]
    fn restoring_reports_the_first_failed_step() {
        let result = Renderer::first_error([
            Ok(()),
            Err(color_eyre::eyre::eyre!("alternate screen")),
            Err(color_eyre::eyre::eyre!("cooked mode")),
        ]);
        assert_eq!(result.unwrap_err().to_string(), "alternate screen");
    }

    #[test]
    fn restoring_runs_every_step() {
        let mut steps = Vec::new();
        let mut step = |name: &'static str, is_ok: bool| {
            steps.push(name);
            if is_ok {
                Ok(())
            } else {
                Err(color_eyre::eyre::eyre!(name))
            }
        };
        let result = Renderer::first_error([
            step("flush", false),
            step("exit_alternate_screen", true),
            step("set_cooked_mode", true),
        ]);
        assert_eq!(result.unwrap_err().to_string(), "flush");
        assert_eq!(steps, ["flush", "exit_alternate_screen", "set_cooked_mode"]);
    }

    #[test]
    fn nothing_failing_restores_cleanly() {
        assert!(Renderer::first_error([Ok(()), Ok(()), Ok(())]).is_ok());
    }
}
