//! `:alias:` emoji table

use std::collections::HashMap;
use std::sync::LazyLock;

const EMOJI: &[(&str, &str)] = &[
    ("+1", "👍"),
    ("-1", "👎"),
    ("100", "💯"),
    ("alarm_clock", "⏰"),
    ("angry", "😠"),
    ("apple", "🍎"),
    ("art", "🎨"),
    ("baby", "👶"),
    ("bangbang", "‼️"),
    ("beer", "🍺"),
    ("bell", "🔔"),
    ("blush", "😊"),
    ("bomb", "💣"),
    ("book", "📖"),
    ("books", "📚"),
    ("bookmark", "🔖"),
    ("boom", "💥"),
    ("bug", "🐛"),
    ("bulb", "💡"),
    ("calendar", "📆"),
    ("camera", "📷"),
    ("cat", "🐱"),
    ("check", "✔️"),
    ("clap", "👏"),
    ("clipboard", "📋"),
    ("cloud", "☁️"),
    ("coffee", "☕"),
    ("confused", "😕"),
    ("construction", "🚧"),
    ("cool", "🆒"),
    ("cry", "😢"),
    ("dog", "🐶"),
    ("email", "📧"),
    ("exclamation", "❗"),
    ("eyes", "👀"),
    ("fire", "🔥"),
    ("flushed", "😳"),
    ("gift", "🎁"),
    ("grin", "😁"),
    ("grinning", "😀"),
    ("hammer", "🔨"),
    ("heart", "❤️"),
    ("heavy_check_mark", "✔️"),
    ("hourglass", "⌛"),
    ("house", "🏠"),
    ("hugs", "🤗"),
    ("joy", "😂"),
    ("key", "🔑"),
    ("kiss", "💋"),
    ("laughing", "😆"),
    ("link", "🔗"),
    ("lock", "🔒"),
    ("mag", "🔍"),
    ("memo", "📝"),
    ("moon", "🌙"),
    ("muscle", "💪"),
    ("musical_note", "🎵"),
    ("no_entry", "⛔"),
    ("ok", "🆗"),
    ("ok_hand", "👌"),
    ("pencil", "📝"),
    ("pencil2", "✏️"),
    ("pray", "🙏"),
    ("pushpin", "📌"),
    ("question", "❓"),
    ("rage", "😡"),
    ("rainbow", "🌈"),
    ("rocket", "🚀"),
    ("rotating_light", "🚨"),
    ("rose", "🌹"),
    ("scream", "😱"),
    ("see_no_evil", "🙈"),
    ("smile", "😄"),
    ("smiley", "😃"),
    ("smirk", "😏"),
    ("sob", "😭"),
    ("sparkles", "✨"),
    ("star", "⭐"),
    ("sunny", "☀️"),
    ("sweat_smile", "😅"),
    ("tada", "🎉"),
    ("thinking", "🤔"),
    ("thumbsdown", "👎"),
    ("thumbsup", "👍"),
    ("trophy", "🏆"),
    ("umbrella", "☔"),
    ("unlock", "🔓"),
    ("warning", "⚠️"),
    ("wave", "👋"),
    ("white_check_mark", "✅"),
    ("wink", "😉"),
    ("x", "❌"),
    ("yum", "😋"),
    ("zap", "⚡"),
    ("zzz", "💤"),
];

static ALIAS_TO_EMOJI: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| EMOJI.iter().copied().collect());

static EMOJI_TO_ALIAS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for &(alias, emoji) in EMOJI {
        map.entry(emoji).or_insert(alias);
    }
    map
});

/// Built-in emoji for an alias, without the surrounding colons
pub fn lookup_emoji(alias: &str) -> Option<&'static str> {
    ALIAS_TO_EMOJI.get(alias).copied()
}

/// Alias of a built-in emoji character sequence
pub(crate) fn alias_of(emoji: &str) -> Option<&'static str> {
    EMOJI_TO_ALIAS.get(emoji).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_emoji("smile"), Some("😄"));
        assert_eq!(lookup_emoji("+1"), Some("👍"));
        assert_eq!(lookup_emoji("not_an_emoji"), None);
        assert_eq!(alias_of("🚀"), Some("rocket"));
    }

    #[test]
    fn test_aliases_unique() {
        assert_eq!(ALIAS_TO_EMOJI.len(), EMOJI.len());
    }
}
