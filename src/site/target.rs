use url::Url;

/// Splits an operator-supplied target into a board and an optional thread
///
/// Accepts the crosslink notation used on imageboards (`>>>/g/51971506`),
/// bare boards (`g`, `/g/`), space separated pairs (`g 51971506`) and full
/// thread URLs (`https://boards.4chan.org/g/thread/51971506`). The thread is
/// the first all-digit segment after the board, ignoring any extension.
///
/// Returns None when no board can be found.
pub fn parse_target(target: &str) -> Option<(String, Option<String>)> {
    let target = target.trim();

    let path = if target.contains("://") {
        Url::parse(target).ok()?.path().to_string()
    } else {
        target.trim_start_matches('>').to_string()
    };

    let mut segments = path
        .split(|c: char| c == '/' || c.is_whitespace())
        .filter(|segment| !segment.is_empty());

    let board = segments.next()?.to_string();
    let thread = segments.find_map(|segment| {
        // "12.html" and "12.json" name the same thread as "12"
        let stem = segment.split('.').next()?;
        (!stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit())).then(|| stem.to_string())
    });

    Some((board, thread))
}
