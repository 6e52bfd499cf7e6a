// Terminal Controller - plays the game over a line-based text stream
//
// This module contains the TerminalController which coordinates between:
// - Player input (one command per line)
// - SettingsStore / LeaderboardStore (persistence)
// - SessionDriver (one running play-through at a time)
//
// Input and output are generic async streams so the whole front-end can be
// driven from tests.

use crate::metrics::Metrics;
use crate::models::leaderboard::rank_label;
use crate::models::{GameMode, Settings, Theme, TimingConfig};
use crate::services::avatar::encode_data_url;
use crate::services::image_set::{ImageSetProvider, ImageSetWarning};
use crate::state::{
    FailureCause, RoundSession, SessionDriver, SessionEvent, SessionOutcome, SessionSnapshot,
    Transition,
};
use crate::storage::{LeaderboardStore, SettingsStore};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::broadcast::error::RecvError;

/// Entries shown per mode on the leaderboard screen.
const LEADERBOARD_ROWS: usize = 5;

/// Countdown values above this are only announced every ten seconds.
const TIMER_WARNING_SECS: u32 = 5;

/// A main-menu command
#[derive(Debug, Clone, PartialEq)]
pub enum MenuCommand {
    Play(GameMode),
    Scores(Option<GameMode>),
    ClearScores,
    ShowSettings,
    SetName(String),
    SetVolume(f32),
    SetMusic(bool),
    SetSfx(bool),
    SetTheme(Theme),
    SetAvatar(Option<Utf8PathBuf>),
    ResetSettings,
    Help,
    Quit,
}

/// A command typed while a session is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    Pick(u32),
    Retry,
    Exit,
}

fn parse_toggle(arg: &str) -> Result<bool, String> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on/off, got {other:?}")),
    }
}

/// Parse one main-menu line.
pub fn parse_menu_command(line: &str) -> Result<MenuCommand, String> {
    let line = line.trim();
    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "play" | "p" => arg.parse().map(MenuCommand::Play),
        "scores" | "leaderboard" => {
            if arg.is_empty() {
                Ok(MenuCommand::Scores(None))
            } else {
                arg.parse().map(|mode| MenuCommand::Scores(Some(mode)))
            }
        }
        "clear-scores" => Ok(MenuCommand::ClearScores),
        "settings" => Ok(MenuCommand::ShowSettings),
        "name" => Ok(MenuCommand::SetName(arg.to_string())),
        "volume" => arg
            .parse::<f32>()
            .map_err(|e| format!("invalid volume {arg:?}: {e}"))
            .and_then(|v| {
                if (0.0..=1.0).contains(&v) {
                    Ok(MenuCommand::SetVolume(v))
                } else {
                    Err("volume must be between 0 and 1".to_string())
                }
            }),
        "music" => parse_toggle(arg).map(MenuCommand::SetMusic),
        "sfx" => parse_toggle(arg).map(MenuCommand::SetSfx),
        "theme" => arg.parse().map(MenuCommand::SetTheme),
        "avatar" => match arg {
            "" => Err("usage: avatar <image path> | avatar none".to_string()),
            "none" => Ok(MenuCommand::SetAvatar(None)),
            path => Ok(MenuCommand::SetAvatar(Some(Utf8PathBuf::from(path)))),
        },
        "reset-settings" => Ok(MenuCommand::ResetSettings),
        "help" | "?" => Ok(MenuCommand::Help),
        "quit" | "q" => Ok(MenuCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command {other:?}, type 'help'")),
    }
}

/// Parse one in-game line.
pub fn parse_game_command(line: &str) -> Option<GameCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "retry" | "r" => Some(GameCommand::Retry),
        "exit" | "x" | "menu" => Some(GameCommand::Exit),
        other => other.parse().ok().map(GameCommand::Pick),
    }
}

fn mime_for(path: &Utf8PathBuf) -> &'static str {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Text front-end for the game.
///
/// Owns the loaded [`Settings`] and runs at most one [`SessionDriver`] at a
/// time; leaving a session always tears its driver down.
pub struct TerminalController {
    settings_store: SettingsStore,
    leaderboard: Arc<LeaderboardStore>,
    provider: Arc<ImageSetProvider>,
    timing: TimingConfig,
    metrics: Arc<Metrics>,
    settings: Settings,
}

impl TerminalController {
    /// Create a controller and load the persisted settings.
    pub fn new(
        settings_store: SettingsStore,
        leaderboard: Arc<LeaderboardStore>,
        provider: Arc<ImageSetProvider>,
        timing: TimingConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let settings = settings_store.load();
        Self {
            settings_store,
            leaderboard,
            provider,
            timing,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the main menu until `quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        say(&mut out, "Real or Render? Can you spot the AI-generated image?").await?;
        say(&mut out, &format!("Welcome, {}! Type 'help' for commands.", self.settings.leaderboard_name())).await?;

        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match parse_menu_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    say(&mut out, &e).await?;
                    continue;
                }
            };
            tracing::debug!("Menu command: {:?}", command);

            match command {
                MenuCommand::Play(mode) => {
                    let keep_going = self.play(mode, &mut lines, &mut out).await?;
                    if !keep_going {
                        break;
                    }
                    say(&mut out, "Back at the main menu.").await?;
                }
                MenuCommand::Scores(mode) => self.show_scores(mode, &mut out).await?,
                MenuCommand::ClearScores => self.clear_scores(&mut lines, &mut out).await?,
                MenuCommand::ShowSettings => self.show_settings(&mut out).await?,
                MenuCommand::SetName(name) => {
                    let mut updated = self.settings.clone();
                    updated.player_name = name;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::SetVolume(volume) => {
                    let mut updated = self.settings.clone();
                    updated.master_volume = volume;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::SetMusic(on) => {
                    let mut updated = self.settings.clone();
                    updated.music_on = on;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::SetSfx(on) => {
                    let mut updated = self.settings.clone();
                    updated.sfx_on = on;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::SetTheme(theme) => {
                    let mut updated = self.settings.clone();
                    updated.theme = theme;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::SetAvatar(path) => {
                    let avatar = match path {
                        None => None,
                        Some(path) => match tokio::fs::read(&path).await {
                            Ok(bytes) => Some(encode_data_url(mime_for(&path), &bytes)),
                            Err(e) => {
                                say(&mut out, &format!("Could not read {path}: {e}")).await?;
                                continue;
                            }
                        },
                    };
                    let mut updated = self.settings.clone();
                    updated.avatar = avatar;
                    self.save_settings(updated, &mut out).await?;
                }
                MenuCommand::ResetSettings => {
                    self.save_settings(Settings::default(), &mut out).await?;
                }
                MenuCommand::Help => self.show_help(&mut out).await?,
                MenuCommand::Quit => break,
            }
        }

        say(&mut out, "Bye!").await?;
        Ok(())
    }

    /// Play one mode until the player exits.
    ///
    /// # Returns
    /// `false` when input ended mid-session and the program should stop
    async fn play<R, W>(&mut self, mode: GameMode, lines: &mut Lines<R>, out: &mut W) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        say(out, &format!("{} mode: {}", mode, mode.description())).await?;

        let session = RoundSession::new(
            mode,
            self.settings.leaderboard_name(),
            self.provider.clone(),
            self.leaderboard.clone(),
        )
        .with_time_limit(self.timing.hard_time_limit_secs);
        let (driver, mut events) = SessionDriver::spawn(session, self.timing, self.metrics.clone());
        // Wait for the task to start so the first round is shown before any input is read
        driver.snapshot().await?;

        let keep_going = loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Ok(event) => self.render_event(&event, out).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Renderer lagged behind by {} events", skipped);
                    }
                    Err(RecvError::Closed) => break true,
                },

                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        break false;
                    };
                    match parse_game_command(&line) {
                        Some(GameCommand::Pick(id)) => driver.select(id).await?,
                        Some(GameCommand::Retry) => driver.retry().await?,
                        Some(GameCommand::Exit) => break true,
                        None => {
                            say(out, "Type an image number, 'retry' or 'exit'.").await?;
                            continue;
                        }
                    }
                    // Round-trip so the command's event is queued before the next line is read
                    driver.snapshot().await?;
                }
            }
        };

        driver.exit().await?;
        Ok(keep_going)
    }

    async fn render_event<W: AsyncWrite + Unpin>(&self, event: &SessionEvent, out: &mut W) -> Result<()> {
        let snapshot = &event.snapshot;
        match &event.transition {
            Transition::Started | Transition::NextRound { .. } => {
                self.render_round(snapshot, out).await?;
            }
            Transition::Correct { score } => {
                say(out, &format!("Correct! Score: {score}")).await?;
            }
            Transition::Ticked { time_left } => {
                if *time_left <= TIMER_WARNING_SECS || time_left % 10 == 0 {
                    say(out, &format!("⏱ {time_left}s left")).await?;
                }
            }
            Transition::Over { outcome, score, recorded } => {
                let headline = match outcome {
                    SessionOutcome::Completed => "All rounds cleared!".to_string(),
                    SessionOutcome::Failed(FailureCause::WrongPick { target: Some(t), .. }) => {
                        format!("Wrong. The AI image was #{t}.")
                    }
                    SessionOutcome::Failed(FailureCause::WrongPick { target: None, .. }) => {
                        "Wrong.".to_string()
                    }
                    SessionOutcome::Failed(FailureCause::TimedOut) => "Time's up!".to_string(),
                };
                say(out, &headline).await?;
                let saved = if *recorded { " (saved to leaderboard)" } else { "" };
                say(out, &format!("Final score: {score}{saved}")).await?;
                say(out, "Type 'retry' to play again or 'exit' for the menu.").await?;
            }
            Transition::Ignored => {}
        }
        Ok(())
    }

    async fn render_round<W: AsyncWrite + Unpin>(&self, snapshot: &SessionSnapshot, out: &mut W) -> Result<()> {
        let round = match snapshot.max_rounds {
            Some(max) => format!("Round {}/{}", snapshot.round, max),
            None => format!("Round {}", snapshot.round),
        };
        let timer = snapshot
            .time_left
            .map(|t| format!("  ⏱ {t}s"))
            .unwrap_or_default();
        say(out, &format!("{round}  Score: {}{timer}", snapshot.score)).await?;

        if snapshot.warning == Some(ImageSetWarning::EmptyPool) {
            say(out, "Warning: no AI images available, one slot is empty.").await?;
        }
        for img in &snapshot.images {
            let src = if img.source_ref.is_empty() { "(missing image)" } else { &img.source_ref };
            say(out, &format!("  [{}] {}", img.id, src)).await?;
        }
        say(out, "Which image is AI-generated?").await
    }

    async fn show_scores<W: AsyncWrite + Unpin>(&self, mode: Option<GameMode>, out: &mut W) -> Result<()> {
        let modes = match mode {
            Some(mode) => vec![mode],
            None => GameMode::ALL.to_vec(),
        };

        for mode in modes {
            say(out, &format!("== {} ==", mode.as_str().to_uppercase())).await?;
            let top = self.leaderboard.top_scores(mode, LEADERBOARD_ROWS);
            if top.is_empty() {
                say(out, "No scores yet. Play to set a record!").await?;
                continue;
            }
            for (idx, entry) in top.iter().enumerate() {
                let stars = entry.stars() as usize;
                say(
                    out,
                    &format!(
                        "{:>3} {:<24} {:>6}  {}{}",
                        rank_label(idx + 1),
                        entry.player_name,
                        entry.score,
                        "★".repeat(stars),
                        "☆".repeat(5 - stars)
                    ),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn clear_scores<R, W>(&self, lines: &mut Lines<R>, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        say(out, "Delete all scores? [y/N]").await?;
        let answer = lines.next_line().await.context("Failed to read input")?;
        let confirmed = answer.is_some_and(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes"));
        if !confirmed {
            return say(out, "Kept the leaderboard.").await;
        }

        match self.leaderboard.clear() {
            Ok(()) => say(out, "Leaderboard cleared.").await,
            Err(e) => {
                tracing::warn!("Failed to clear leaderboard: {}", e);
                say(out, "Could not clear the leaderboard.").await
            }
        }
    }

    async fn show_settings<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<()> {
        let s = &self.settings;
        let avatar = match &s.avatar {
            Some(a) => format!("{} bytes", a.len()),
            None => "none".to_string(),
        };
        say(out, &format!("Name:   {}", s.player_name)).await?;
        say(out, &format!("Volume: {:.0}%", s.master_volume * 100.0)).await?;
        say(out, &format!("Music:  {}", if s.music_on { "on" } else { "off" })).await?;
        say(out, &format!("SFX:    {}", if s.sfx_on { "on" } else { "off" })).await?;
        say(out, &format!("Theme:  {}", s.theme)).await?;
        say(out, &format!("Avatar: {avatar}")).await
    }

    async fn save_settings<W: AsyncWrite + Unpin>(&mut self, updated: Settings, out: &mut W) -> Result<()> {
        let outcome = self.settings_store.save(&updated);
        if outcome.avatar_dropped || !outcome.saved {
            self.metrics.record_settings_save_degraded();
        }

        match outcome.stored {
            Some(stored) => {
                self.settings = stored;
                say(out, "Settings saved.").await?;
                if outcome.avatar_dropped {
                    say(out, "Your avatar was too large to keep and has been removed.").await?;
                }
                Ok(())
            }
            None => {
                self.settings = updated.normalized();
                say(out, "Settings could not be saved; changes last until you quit.").await
            }
        }
    }

    async fn show_help<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<()> {
        for mode in GameMode::ALL {
            say(out, &format!("  play {:<7} {}", mode.as_str(), mode.description())).await?;
        }
        say(out, "  scores [mode]      show the leaderboard").await?;
        say(out, "  clear-scores       delete every recorded score").await?;
        say(out, "  settings           show your settings").await?;
        say(out, "  name <text>        set your player name (24 chars max)").await?;
        say(out, "  volume <0..1>      set the master volume").await?;
        say(out, "  music on|off, sfx on|off, theme neon|dark|retro").await?;
        say(out, "  avatar <path>|none set or remove your avatar image").await?;
        say(out, "  reset-settings     restore the defaults").await?;
        say(out, "  quit").await?;
        say(out, "In a game: type an image number, 'retry' or 'exit'.").await
    }
}
