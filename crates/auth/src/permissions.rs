use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Operation flag requested against a unit.
///
/// Flags arrive as single characters (`c`, `r`, `u`, `d`). Anything else is
/// kept as [`Flag::Unknown`] so that per-flag gates can deny it explicitly.
/// Unrecognised multi-character input becomes
/// `Unknown(Flag::UNRECOGNISED)` rather than its first letter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Create,
    Read,
    Update,
    Delete,
    Unknown(char),
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Create, Flag::Read, Flag::Update, Flag::Delete];

    /// Payload of [`Flag::Unknown`] for input that is not a single character.
    pub const UNRECOGNISED: char = char::REPLACEMENT_CHARACTER;

    /// Parse a flag from route metadata. Empty input means "no flag".
    ///
    /// Accepts the one-letter form or the full word, case-insensitively.
    pub fn parse(s: &str) -> Option<Flag> {
        let s = s.trim();
        let mut chars = s.chars();
        let first = chars.next()?;
        if chars.next().is_none() {
            return Some(Flag::from(first));
        }
        Some(match s.to_ascii_lowercase().as_str() {
            "create" => Flag::Create,
            "read" => Flag::Read,
            "update" => Flag::Update,
            "delete" => Flag::Delete,
            _ => {
                tracing::warn!(flag = s, "unrecognised flag");
                Flag::Unknown(Flag::UNRECOGNISED)
            }
        })
    }

    pub fn as_char(&self) -> char {
        match self {
            Flag::Create => 'c',
            Flag::Read => 'r',
            Flag::Update => 'u',
            Flag::Delete => 'd',
            Flag::Unknown(c) => *c,
        }
    }
}

impl From<char> for Flag {
    fn from(c: char) -> Self {
        match c.to_ascii_lowercase() {
            'c' => Flag::Create,
            'r' => Flag::Read,
            'u' => Flag::Update,
            'd' => Flag::Delete,
            _ => Flag::Unknown(c),
        }
    }
}

impl core::fmt::Display for Flag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Gate attached to a permission node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum PermissionOption {
    /// Single on/off gate, independent of the requested flag.
    Radio {
        #[serde(default)]
        allow: bool,
    },
    /// One gate per flag.
    Checkbox {
        #[serde(default)]
        create: bool,
        #[serde(default)]
        read: bool,
        #[serde(default)]
        update: bool,
        #[serde(default)]
        delete: bool,
    },
}

/// Does `option` let `flag` through?
pub fn check_flag(flag: Flag, option: &PermissionOption) -> bool {
    match option {
        PermissionOption::Radio { allow } => *allow,
        PermissionOption::Checkbox {
            create,
            read,
            update,
            delete,
        } => match flag {
            Flag::Create => *create,
            Flag::Read => *read,
            Flag::Update => *update,
            Flag::Delete => *delete,
            Flag::Unknown(_) => false,
        },
    }
}

/// One entry of a role's permission tree.
///
/// Trees are two levels deep: top-level nodes may carry `children`, children
/// never do. `option` is `None` when the stored gate is missing or
/// unreadable; such a node never grants anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionNode {
    pub name: String,
    #[serde(default)]
    pub ou_required: bool,
    #[serde(default)]
    pub tag_required: bool,
    #[serde(default, deserialize_with = "lenient_option")]
    pub option: Option<PermissionOption>,
    #[serde(default)]
    pub children: Vec<PermissionNode>,
}

// An unrecognised gate must not make the whole role unreadable; it degrades
// to "no gate" for that node.
fn lenient_option<'de, D>(deserializer: D) -> Result<Option<PermissionOption>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

impl PermissionNode {
    pub fn new(name: impl Into<String>, option: Option<PermissionOption>) -> Self {
        Self {
            name: name.into(),
            ou_required: false,
            tag_required: false,
            option,
            children: Vec::new(),
        }
    }

    pub fn radio(name: impl Into<String>, allow: bool) -> Self {
        Self::new(name, Some(PermissionOption::Radio { allow }))
    }

    pub fn checkbox(name: impl Into<String>, create: bool, read: bool, update: bool, delete: bool) -> Self {
        Self::new(
            name,
            Some(PermissionOption::Checkbox {
                create,
                read,
                update,
                delete,
            }),
        )
    }

    pub fn with_children(mut self, children: Vec<PermissionNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_ou_required(mut self, required: bool) -> Self {
        self.ou_required = required;
        self
    }

    pub fn with_tag_required(mut self, required: bool) -> Self {
        self.tag_required = required;
        self
    }

    /// Flags this node lets through (empty for a malformed node).
    pub fn granted_flags(&self) -> Vec<Flag> {
        match &self.option {
            Some(option) => Flag::ALL
                .into_iter()
                .filter(|flag| check_flag(*flag, option))
                .collect(),
            None => Vec::new(),
        }
    }
}
