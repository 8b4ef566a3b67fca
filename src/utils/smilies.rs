/// Emoticon codes and their emoji. Replacement runs top to bottom, so a code that contains an
/// earlier one (`>:)` contains `:)`) is consumed by the earlier entry first.
pub const SMILIES: &[(&str, &str)] = &[
    (":)", "😊"),
    (":(", "😞"),
    (":D", "😀"),
    (";)", "😉"),
    (":P", "😛"),
    (":O", "😮"),
    (":*", "😘"),
    ("B)", "😎"),
    (">:)", "😈"),
    (":'(", "😢"),
    (":'D", "😂"),
    ("xD", "😆"),
    ("<3", "❤️"),
    (":3", "😺"),
    ("^_^", "😊"),
    ("O_o", "🤨"),
    ("-_-", "😑"),
    ("=(", "😥"),
    (":-*", "😗"),
];

/// Replaces every emoticon code in a message with its emoji.
pub fn parse_smilies(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    SMILIES
        .iter()
        .fold(text.to_string(), |acc, (code, emoji)| {
            if acc.contains(code) {
                acc.replace(code, emoji)
            } else {
                acc
            }
        })
}
