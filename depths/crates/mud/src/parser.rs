/// Canonical exit directions, in the order used for listings and `flee`.
pub const DIRECTIONS: [&str; 10] = [
    "north",
    "south",
    "east",
    "west",
    "northeast",
    "northwest",
    "southeast",
    "southwest",
    "up",
    "down",
];

/// Static alias table: shorthand -> canonical verb.
const ALIASES: &[(&str, &str)] = &[
    ("l", "look"),
    ("n", "north"),
    ("s", "south"),
    ("e", "east"),
    ("w", "west"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("se", "southeast"),
    ("sw", "southwest"),
    ("u", "up"),
    ("d", "down"),
    ("take", "get"),
    ("i", "inventory"),
    ("inv", "inventory"),
    ("eq", "equip"),
    ("wield", "equip"),
    ("wear", "equip"),
    ("remove", "unequip"),
    ("att", "attack"),
    ("a", "attack"),
    ("kill", "attack"),
    ("run", "flee"),
    ("me", "emote"),
    ("score", "stats"),
    ("st", "stats"),
    ("path", "route"),
    ("map", "nearby"),
    ("?", "help"),
    ("q", "quit"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Canonical, lowercase verb after alias substitution.
    pub verb: String,
    pub args: Vec<String>,
    /// Argument text exactly as typed, trimmed.
    pub raw_args: String,
    /// The whole trimmed input line.
    pub raw: String,
}

impl ParsedCommand {
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// Blank line: re-show the current view.
    Empty,
    Command(ParsedCommand),
}

/// Resolve an alias to its canonical verb. Unknown words come back
/// lowercased and otherwise unchanged.
pub fn canonical_verb(word: &str) -> String {
    let lower = word.to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, verb)| verb.to_string())
        .unwrap_or(lower)
}

/// Aliases that map onto `verb`, in table order.
pub fn aliases_for(verb: &str) -> Vec<&'static str> {
    ALIASES
        .iter()
        .filter(|(_, v)| *v == verb)
        .map(|(alias, _)| *alias)
        .collect()
}

/// Full direction name for `word` (`"ne"` and `"northeast"` both give
/// `"northeast"`).
pub fn canonical_direction(word: &str) -> Option<&'static str> {
    let verb = canonical_verb(word);
    DIRECTIONS.iter().copied().find(|d| *d == verb)
}

pub fn parse_line(line: &str) -> ParsedInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedInput::Empty;
    }

    // Sigils bypass the alias table and take the rest of the line verbatim.
    if let Some(first) = trimmed.chars().next() {
        let sigil_verb = match first {
            '\'' | '"' => Some("say"),
            ':' => Some("emote"),
            _ => None,
        };
        if let Some(verb) = sigil_verb {
            let rest = trimmed[first.len_utf8()..].trim();
            return ParsedInput::Command(ParsedCommand {
                verb: verb.to_string(),
                args: if rest.is_empty() {
                    Vec::new()
                } else {
                    vec![rest.to_string()]
                },
                raw_args: rest.to_string(),
                raw: trimmed.to_string(),
            });
        }
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    ParsedInput::Command(ParsedCommand {
        verb: canonical_verb(word),
        args: split_arguments(rest),
        raw_args: rest.to_string(),
        raw: trimmed.to_string(),
    })
}

/// Split on whitespace, keeping double- or single-quoted runs together.
/// An unterminated quote runs to the end of the text.
pub fn split_arguments(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        args.push(current);
    }
    args
}
