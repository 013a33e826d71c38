//! PGN parsing utilities: a lightweight regex-based parser and writer.

use std::sync::LazyLock;

use regex::Regex;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Header values may contain brackets and backslash-escaped quotes
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[(\w+)\s+"((?:[^"\\]|\\.)*)"\]"#).expect("valid header regex")
});
static HEADER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[\w+\s+"(?:[^"\\]|\\.)*"\]"#).expect("valid header line regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}|;[^\n]*").expect("valid comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid variation regex"));
static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.+(.*)$").expect("valid move number regex"));
static SAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?:[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?|O-O-O|O-O|0-0-0|0-0)[+#]?)[!?]*$",
    )
    .expect("valid SAN regex")
});
static NAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$\d+$").expect("valid NAG regex"));

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Headers and mainline moves of a single PGN game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPgn {
    pub headers: Vec<(String, String)>,
    pub moves: Vec<String>, // SAN tokens as written
    pub result: Option<String>,
}

impl ParsedPgn {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// FEN of the starting position when the game does not start from the standard setup.
    pub fn setup_fen(&self) -> Option<&str> {
        let fen = self.header("FEN")?;
        match self.header("SetUp") {
            Some("0") => None,
            _ if fen == STANDARD_START_FEN => None,
            _ => Some(fen),
        }
    }
}

fn unescape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            other => out.push(other),
        }
    }
    out
}

/// Parse a PGN string into headers and mainline SAN tokens.
///
/// Comments, variations and NAGs are skipped. Any other unrecognised movetext
/// token makes the whole game invalid.
pub fn parse_pgn(pgn: &str) -> Result<ParsedPgn, String> {
    let headers: Vec<(String, String)> = HEADER_RE
        .captures_iter(pgn)
        .map(|cap| (cap[1].to_string(), unescape_header(&cap[2])))
        .collect();

    let no_headers = HEADER_LINE_RE.replace_all(pgn, "");
    let mut movetext = COMMENT_RE.replace_all(&no_headers, " ").into_owned();

    // Innermost variations first until none are left
    loop {
        let stripped = VARIATION_RE.replace_all(&movetext, " ").into_owned();
        if stripped == movetext {
            break;
        }
        movetext = stripped;
    }
    if movetext.contains('(') || movetext.contains(')') {
        return Err("Unbalanced variation".to_string());
    }

    let mut moves = Vec::new();
    let mut result = None;

    for raw in movetext.split_whitespace() {
        let token = match MOVE_NUMBER_RE.captures(raw) {
            Some(cap) => cap[2].to_string(),
            None => raw.to_string(),
        };
        if token.is_empty() || NAG_RE.is_match(&token) {
            continue;
        }
        if RESULT_TOKENS.contains(&token.as_str()) {
            result = Some(token);
            continue;
        }
        if result.is_some() {
            return Err(format!("Unexpected token '{token}' after game result"));
        }
        match SAN_RE.captures(&token) {
            // Ranks never contain a zero, so this only touches "0-0" castling
            Some(cap) => moves.push(cap[1].replace('0', "O")),
            None => return Err(format!("Unexpected token '{token}'")),
        }
    }

    Ok(ParsedPgn {
        headers,
        moves,
        result,
    })
}

/// Where numbering of exported movetext begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovetextStart {
    pub fullmove: u32,
    pub white_to_move: bool,
}

impl Default for MovetextStart {
    fn default() -> Self {
        Self {
            fullmove: 1,
            white_to_move: true,
        }
    }
}

/// Render a PGN document. Returns an empty string when there is nothing to write.
pub fn export_pgn(
    headers: &[(String, String)],
    moves: &[String],
    start: MovetextStart,
    result: &str,
) -> String {
    if headers.is_empty() && moves.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for (key, value) in headers {
        out.push_str(&format!("[{key} \"{}\"]\n", value.replace('"', "'")));
    }
    if !headers.is_empty() {
        out.push('\n');
    }

    let mut tokens = Vec::with_capacity(moves.len() * 3 / 2 + 1);
    let mut fullmove = start.fullmove;
    let mut white = start.white_to_move;
    for (i, mv) in moves.iter().enumerate() {
        if white {
            tokens.push(format!("{fullmove}."));
        } else if i == 0 {
            tokens.push(format!("{fullmove}..."));
        }
        tokens.push(mv.clone());
        if !white {
            fullmove += 1;
        }
        white = !white;
    }
    tokens.push(result.to_string());

    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > 80 {
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

/// Labels for the move-history panel: "1. e4", "1... e5".
pub fn format_move_list(moves: &[String]) -> Vec<String> {
    moves
        .iter()
        .enumerate()
        .map(|(i, mv)| {
            let number = i / 2 + 1;
            if i % 2 == 0 {
                format!("{number}. {mv}")
            } else {
                format!("{number}... {mv}")
            }
        })
        .collect()
}
