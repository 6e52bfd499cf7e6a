// UI module - text front-end
//
// TerminalController runs the main menu and play loop over any async line
// stream (stdin in the binary, in-memory buffers in tests).

pub mod terminal;

pub use terminal::{GameCommand, MenuCommand, TerminalController, parse_game_command, parse_menu_command};
