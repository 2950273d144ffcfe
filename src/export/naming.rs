//! Name sanitizing and collision resolution for batch artifacts.

use std::collections::HashSet;

/// Longest sheet name a workbook accepts.
pub const SHEET_NAME_LIMIT: usize = 31;

/// Sheet names spreadsheet applications reserve for themselves.
pub const RESERVED_SHEET_NAMES: [&str; 1] = ["History"];

const SHEET_NAME_FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Reduce an uploaded filename to something safe to use as an archive entry
/// name. Directory components are dropped.
pub fn safe_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim() {
        "" => "imagen".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// A valid sheet name derived from `name`: forbidden characters replaced,
/// at most [`SHEET_NAME_LIMIT`] characters, no leading or trailing
/// apostrophes.
pub fn safe_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SHEET_NAME_FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    let truncated: String = replaced.trim().chars().take(SHEET_NAME_LIMIT).collect();

    match truncated.trim_matches(|c: char| c == '\'' || c.is_whitespace()) {
        "" => "Imagen".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// File name without its extension. Leading dots do not start an extension,
/// so `.hidden` stays `.hidden`.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if name[..dot].trim_start_matches('.').is_empty() => name,
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// Hands out unique names in claim order.
///
/// Names are compared case-insensitively. A taken candidate is retried as
/// `<base>_2`, `<base>_3`, ... and, when a length limit applies, the base is
/// shortened so the suffixed name still fits.
#[derive(Debug, Clone, Default)]
pub struct NamingResolver {
    claimed: HashSet<String>,
    limit: Option<usize>,
}

impl NamingResolver {
    /// Resolver for workbook sheet names: 31-character limit, reserved names
    /// pre-claimed.
    pub fn for_sheets() -> Self {
        let mut resolver = Self {
            claimed: HashSet::new(),
            limit: Some(SHEET_NAME_LIMIT),
        };
        for reserved in RESERVED_SHEET_NAMES {
            resolver.claimed.insert(reserved.to_lowercase());
        }
        resolver
    }

    /// Resolver for archive entry base names, no length limit.
    pub fn for_files() -> Self {
        Self::default()
    }

    /// Claim the first free variant of `candidate` and return it.
    pub fn claim(&mut self, candidate: &str) -> String {
        let base = self.fit(candidate, 0);
        if self.claimed.insert(base.to_lowercase()) {
            return base;
        }

        let mut k = 2u32;
        loop {
            let suffix = format!("_{k}");
            let name = format!("{}{suffix}", self.fit(&base, suffix.chars().count()));
            if self.claimed.insert(name.to_lowercase()) {
                return name;
            }
            k += 1;
        }
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(&name.to_lowercase())
    }

    fn fit(&self, name: &str, reserve: usize) -> String {
        match self.limit {
            Some(limit) => name.chars().take(limit.saturating_sub(reserve)).collect(),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("reef #1.jpg"), "reef _1.jpg");
        assert_eq!(safe_filename("C:\\fotos\\q (2).png"), "q (2).png");
        assert_eq!(safe_filename("../../etc/passwd"), "passwd");
        assert_eq!(safe_filename("  "), "imagen");
        assert_eq!(safe_filename("dir/"), "imagen");
        assert_eq!(safe_filename("arrecife_ñ.png"), "arrecife_ñ.png");
    }

    #[test]
    fn test_safe_sheet_name_limits() {
        let name = safe_sheet_name("[quadrat]:*?/\\ with a very long descriptive name");
        assert!(name.chars().count() <= SHEET_NAME_LIMIT);
        assert!(!name.contains(SHEET_NAME_FORBIDDEN));
        assert!(name.starts_with("_quadrat_"));

        assert_eq!(safe_sheet_name("   "), "Imagen");
        assert_eq!(safe_sheet_name("'quoted'"), "quoted");
        assert_eq!(safe_sheet_name("''"), "Imagen");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("reef.tar.png"), "reef.tar");
        assert_eq!(file_stem("reef"), "reef");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem("..png"), "..png");
    }

    #[test]
    fn test_collisions_claim_in_order() {
        let mut sheets = NamingResolver::for_sheets();
        let claimed: Vec<_> = ["Img", "Img", "img"]
            .iter()
            .map(|c| sheets.claim(c))
            .collect();
        assert_eq!(claimed, ["Img", "Img_2", "img_3"]);
        assert!(sheets.is_claimed("IMG_2"));
    }

    #[test]
    fn test_reserved_sheet_name() {
        let mut sheets = NamingResolver::for_sheets();
        assert_eq!(sheets.claim("history"), "history_2");

        let mut files = NamingResolver::for_files();
        assert_eq!(files.claim("History"), "History");
    }

    #[test]
    fn test_long_names_stay_within_limit() {
        let long = "x".repeat(40);
        let mut sheets = NamingResolver::for_sheets();
        let names: Vec<_> = (0..12).map(|_| sheets.claim(&safe_sheet_name(&long))).collect();

        assert!(names.iter().all(|n| n.chars().count() <= SHEET_NAME_LIMIT));
        assert_eq!(names[1], format!("{}_2", "x".repeat(29)));
        assert_eq!(names[11], format!("{}_12", "x".repeat(28)));
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
