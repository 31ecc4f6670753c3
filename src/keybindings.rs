//! Keybinding registry: maps keys to actions per view, with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;
use std::fmt;

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    PageDown,
    PageUp,
    First,
    Last,
    NextList,
    PrevList,
    ShowEmailed,
    ShowShared,
    ShowViewed,
    Select,
    Back,
    Retry,
    OpenInBrowser,
}

impl Action {
    /// Short label used in the status bar key hints.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::NavDown => "down",
            Self::NavUp => "up",
            Self::PageDown => "page down",
            Self::PageUp => "page up",
            Self::First => "first",
            Self::Last => "last",
            Self::NextList => "next list",
            Self::PrevList => "prev list",
            Self::ShowEmailed => "emailed",
            Self::ShowShared => "shared",
            Self::ShowViewed => "viewed",
            Self::Select => "open",
            Self::Back => "back",
            Self::Retry => "reload",
            Self::OpenInBrowser => "browser",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().replace('-', "_").as_str() {
            "quit" => Self::Quit,
            "nav_down" | "down" => Self::NavDown,
            "nav_up" | "up" => Self::NavUp,
            "page_down" => Self::PageDown,
            "page_up" => Self::PageUp,
            "first" => Self::First,
            "last" => Self::Last,
            "next_list" => Self::NextList,
            "prev_list" => Self::PrevList,
            "show_emailed" | "emailed" => Self::ShowEmailed,
            "show_shared" | "shared" => Self::ShowShared,
            "show_viewed" | "viewed" => Self::ShowViewed,
            "select" | "enter" => Self::Select,
            "back" => Self::Back,
            "retry" | "reload" => Self::Retry,
            "open_in_browser" | "open" => Self::OpenInBrowser,
            _ => return None,
        })
    }
}

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Context {
    Global,
    List,
    Detail,
}

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Parse a key string from config.
    ///
    /// Supported formats: single characters ("q", "/"), named keys ("Enter",
    /// "Esc", "Tab", "PageDown", ...), and "Ctrl+<char>".
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(rest) = s.strip_prefix("Ctrl+") {
            let mut chars = rest.trim().chars();
            let c = chars.next()?;
            return chars.next().is_none().then(|| Self::ctrl(c));
        }

        let named = match s.to_lowercase().as_str() {
            "enter" | "return" => Some(KeyCode::Enter),
            "esc" | "escape" => Some(KeyCode::Esc),
            "tab" => Some(KeyCode::Tab),
            "backtab" => Some(KeyCode::BackTab),
            "up" => Some(KeyCode::Up),
            "down" => Some(KeyCode::Down),
            "left" => Some(KeyCode::Left),
            "right" => Some(KeyCode::Right),
            "home" => Some(KeyCode::Home),
            "end" => Some(KeyCode::End),
            "pageup" => Some(KeyCode::PageUp),
            "pagedown" => Some(KeyCode::PageDown),
            "space" => Some(KeyCode::Char(' ')),
            _ => None,
        };
        if let Some(code) = named {
            return Some(Self::plain(code));
        }

        let mut chars = s.chars();
        let c = chars.next()?;
        chars.next().is_none().then(|| Self::plain(KeyCode::Char(c)))
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::BackTab => f.write_str("BackTab"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PgUp"),
            KeyCode::PageDown => f.write_str("PgDn"),
            KeyCode::Backspace => f.write_str("Backspace"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Registry of keybindings with context-aware lookup.
///
/// The same key can map to different actions in different contexts;
/// lookups fall back to [`Context::Global`].
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
    }

    fn register_defaults(&mut self) {
        use Action as A;
        use KeyCode::*;

        let global = [
            (Char('q'), A::Quit),
            (Tab, A::NextList),
            (BackTab, A::PrevList),
            (Char('1'), A::ShowEmailed),
            (Char('2'), A::ShowShared),
            (Char('3'), A::ShowViewed),
            (Char('o'), A::OpenInBrowser),
        ];
        for (code, action) in global {
            self.bind(Context::Global, KeySpec::plain(code), action);
        }
        self.bind(Context::Global, KeySpec::ctrl('c'), A::Quit);
        // crossterm reports BackTab and shifted letters with SHIFT on most terminals
        self.bind(
            Context::Global,
            KeySpec::new(BackTab, KeyModifiers::SHIFT),
            A::PrevList,
        );

        let list = [
            (Char('j'), A::NavDown),
            (Down, A::NavDown),
            (Char('k'), A::NavUp),
            (Up, A::NavUp),
            (PageDown, A::PageDown),
            (PageUp, A::PageUp),
            (Char('g'), A::First),
            (Home, A::First),
            (Char('G'), A::Last),
            (End, A::Last),
            (Char('l'), A::NextList),
            (Right, A::NextList),
            (Char('h'), A::PrevList),
            (Left, A::PrevList),
            (Enter, A::Select),
            (Char('r'), A::Retry),
        ];
        for (code, action) in list {
            self.bind(Context::List, KeySpec::plain(code), action);
        }
        self.bind(
            Context::List,
            KeySpec::new(Char('G'), KeyModifiers::SHIFT),
            A::Last,
        );

        let detail = [
            (Char('j'), A::NavDown),
            (Down, A::NavDown),
            (Char('k'), A::NavUp),
            (Up, A::NavUp),
            (PageDown, A::PageDown),
            (PageUp, A::PageUp),
            (Esc, A::Back),
            (Char('b'), A::Back),
            (Backspace, A::Back),
        ];
        for (code, action) in detail {
            self.bind(Context::Detail, KeySpec::plain(code), action);
        }
        self.bind(Context::Detail, KeySpec::ctrl('d'), A::PageDown);
        self.bind(Context::Detail, KeySpec::ctrl('u'), A::PageUp);
    }

    /// Apply user overrides from the `[keybindings]` config table.
    ///
    /// Keys are action names ("quit", "retry"), values are key strings.
    /// The new key replaces every default key for the action, in the same
    /// contexts. Returns warnings for unknown actions or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = Action::from_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = KeySpec::parse(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .lookup
                .iter()
                .filter(|(_, a)| **a == action)
                .map(|((c, _), _)| *c)
                .collect();
            contexts.sort();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Look up the action for a key, trying `context` first, then Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers);
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }
}

impl KeybindingRegistry {
    /// The key shown for `action` in `context`.
    ///
    /// Plain character keys win over named and modified keys. Global keys
    /// count only when `context` does not shadow them.
    pub fn key_for(&self, action: Action, context: Context) -> Option<KeySpec> {
        self.lookup
            .iter()
            .filter(|(_, a)| **a == action)
            .filter_map(|((ctx, key), _)| match ctx {
                c if *c == context => Some(*key),
                Context::Global if !self.lookup.contains_key(&(context, *key)) => Some(*key),
                _ => None,
            })
            .min_by_key(|key| {
                (
                    key.modifiers != KeyModifiers::NONE,
                    !matches!(key.code, KeyCode::Char(_)),
                    key.to_string(),
                )
            })
    }

    /// Key hints like `[j]down [Enter]open` for the actions bound in `context`.
    pub fn hint_line(&self, context: Context, actions: &[Action]) -> String {
        actions
            .iter()
            .filter_map(|&action| {
                self.key_for(action, context)
                    .map(|key| format!("[{}]{}", key, action.describe()))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_specific_before_global() {
        let r = KeybindingRegistry::new();
        assert_eq!(
            r.action_for_key(KeyCode::Char('j'), KeyModifiers::NONE, Context::List),
            Some(Action::NavDown)
        );
        assert_eq!(
            r.action_for_key(KeyCode::Esc, KeyModifiers::NONE, Context::Detail),
            Some(Action::Back)
        );
        assert_eq!(
            r.action_for_key(KeyCode::Esc, KeyModifiers::NONE, Context::List),
            None
        );
        // global fallback
        assert_eq!(
            r.action_for_key(KeyCode::Char('q'), KeyModifiers::NONE, Context::Detail),
            Some(Action::Quit)
        );
        assert_eq!(
            r.action_for_key(KeyCode::Char('c'), KeyModifiers::CONTROL, Context::List),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_parse_key_strings() {
        assert_eq!(KeySpec::parse("x"), Some(KeySpec::plain(KeyCode::Char('x'))));
        assert_eq!(KeySpec::parse("Enter"), Some(KeySpec::plain(KeyCode::Enter)));
        assert_eq!(KeySpec::parse("pagedown"), Some(KeySpec::plain(KeyCode::PageDown)));
        assert_eq!(KeySpec::parse("Ctrl+r"), Some(KeySpec::ctrl('r')));
        assert_eq!(KeySpec::parse("Ctrl+rr"), None);
        assert_eq!(KeySpec::parse("bogus"), None);
        assert_eq!(KeySpec::parse(""), None);
    }

    #[test]
    fn test_override_replaces_default_key() {
        let mut r = KeybindingRegistry::new();
        let overrides = HashMap::from([("retry".to_string(), "R".to_string())]);
        assert!(r.apply_overrides(&overrides).is_empty());

        assert_eq!(
            r.action_for_key(KeyCode::Char('R'), KeyModifiers::NONE, Context::List),
            Some(Action::Retry)
        );
        assert_eq!(
            r.action_for_key(KeyCode::Char('r'), KeyModifiers::NONE, Context::List),
            None
        );
    }

    #[test]
    fn test_override_warnings() {
        let mut r = KeybindingRegistry::new();
        let overrides = HashMap::from([
            ("fly".to_string(), "f".to_string()),
            ("quit".to_string(), "Ctrl+".to_string()),
        ]);
        let warnings = r.apply_overrides(&overrides);
        assert_eq!(warnings.len(), 2);
        // quit keeps its default when the override fails
        assert_eq!(
            r.action_for_key(KeyCode::Char('q'), KeyModifiers::NONE, Context::List),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Retry.describe(), "reload");
        assert_eq!(Action::from_name("open-in-browser"), Some(Action::OpenInBrowser));
    }

    #[test]
    fn test_hint_line_prefers_plain_char_keys() {
        let r = KeybindingRegistry::new();
        assert_eq!(
            r.hint_line(
                Context::List,
                &[Action::NavDown, Action::Select, Action::NextList, Action::Quit]
            ),
            "[j]down [Enter]open [l]next list [q]quit"
        );
        assert_eq!(
            r.hint_line(Context::Detail, &[Action::Back, Action::PageDown]),
            "[b]back [PgDn]page down"
        );
        // list-only actions are not advertised in the detail view
        assert_eq!(r.hint_line(Context::Detail, &[Action::Retry]), "");
    }

    #[test]
    fn test_hint_line_follows_overrides() {
        let mut r = KeybindingRegistry::new();
        let overrides = HashMap::from([
            ("retry".to_string(), "R".to_string()),
            ("quit".to_string(), "Ctrl+x".to_string()),
        ]);
        assert!(r.apply_overrides(&overrides).is_empty());
        assert_eq!(
            r.hint_line(Context::List, &[Action::Retry, Action::Quit]),
            "[R]reload [Ctrl+x]quit"
        );
    }
}
