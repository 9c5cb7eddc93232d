// Property File Parser
// Parses simple `key = value` property files with `#` comments

use std::fs;
use std::io;
use std::path::Path;

/// Parse property file text, invoking `handler` for each key-value pair.
///
/// Keys keep their case. Whitespace around keys and values is trimmed,
/// and everything from a `#` to the end of the line is a comment.
/// Lines without `=` are skipped with a warning.
///
/// # Arguments
/// * `data` - The property file content to parse
/// * `handler` - Callback invoked with `(line, key, value)` for each entry
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(usize, &str, &str)) {
    for (index, raw) in data.lines().enumerate() {
        let line = match raw.find('#') {
            Some(hash) => &raw[..hash],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Key without value on line {}: '{}'", index + 1, line);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            log::warn!("Value without key on line {}", index + 1);
            continue;
        }
        handler(index + 1, key, value.trim());
    }
}

/// Reads a property file and collects its entries in file order
pub fn load_propfile(path: &Path) -> io::Result<Vec<(usize, String, String)>> {
    let data = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    parse_propfile(&data, &mut |line, key, value| {
        entries.push((line, key.to_string(), value.to_string()));
    });
    Ok(entries)
}
