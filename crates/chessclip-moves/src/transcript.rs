use std::fmt::Write as _;

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Color, Outcome, Position};

use crate::GameState;

const MAX_LINE: usize = 79;

/// PGN result token for a position: `1-0`, `0-1`, `1/2-1/2`, or `*` while
/// the game is still open.
pub fn result_token(position: &Chess) -> &'static str {
    match position.outcome() {
        Some(Outcome::Decisive {
            winner: Color::White,
        }) => "1-0",
        Some(Outcome::Decisive {
            winner: Color::Black,
        }) => "0-1",
        Some(Outcome::Draw) => "1/2-1/2",
        None => "*",
    }
}

/// Render the game as PGN, replaying the accepted moves from the start
/// position.
///
/// Seven Tag Roster with unknown players, plus `SetUp`/`FEN` for a
/// non-standard start. Movetext is wrapped below 80 columns.
pub fn render_pgn(game: &GameState) -> String {
    let result = result_token(game.position());

    let mut out = String::new();
    for (name, value) in [
        ("Event", "Analyzed"),
        ("Site", "?"),
        ("Date", "????.??.??"),
        ("Round", "?"),
        ("White", "?"),
        ("Black", "?"),
        ("Result", result),
    ] {
        push_tag(&mut out, name, value);
    }
    if let Some(fen) = game.start_fen() {
        push_tag(&mut out, "SetUp", "1");
        push_tag(&mut out, "FEN", fen);
    }
    out.push('\n');

    let mut tokens = Vec::with_capacity(game.ply() * 3 / 2 + 1);
    let mut pos = game.start_position().clone();
    let mut number = pos.fullmoves().get();
    for (i, m) in game.history().iter().enumerate() {
        match pos.turn() {
            Color::White => tokens.push(format!("{number}.")),
            Color::Black if i == 0 => tokens.push(format!("{number}...")),
            Color::Black => {}
        }
        tokens.push(SanPlus::from_move_and_play_unchecked(&mut pos, m).to_string());
        if pos.turn() == Color::White {
            number += 1;
        }
    }
    tokens.push(result.to_string());

    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > MAX_LINE {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        line_len += token.len();
        out.push_str(&token);
    }
    out.push('\n');
    out
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    let _ = writeln!(out, "[{name} \"{escaped}\"]");
}
