// vitrine/src/slug.rs

//! Picture slugs: lowercase ASCII letters, digits and dashes, at most 32 chars.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_SLUG_LEN: usize = 32;

static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug regex should compile"));

/// Derives a slug from a free-form title. Returns `None` when nothing usable
/// remains (e.g. a title made only of punctuation).
pub fn slugify(title: &str) -> Option<String> {
  let mapped: String = title
    .chars()
    .flat_map(fold_to_ascii)
    .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
    .collect();

  let mut slug = mapped.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
  if slug.len() > MAX_SLUG_LEN {
    slug.truncate(MAX_SLUG_LEN);
    slug.truncate(slug.trim_end_matches('-').len());
  }
  (!slug.is_empty()).then_some(slug)
}

pub fn is_valid_slug(slug: &str) -> bool {
  slug.len() <= MAX_SLUG_LEN && SLUG_PATTERN.is_match(slug)
}

/// Latin-1 and common Latin Extended-A letters to their base letters.
fn fold_to_ascii(ch: char) -> impl Iterator<Item = char> {
  let folded: &str = match ch {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
    'æ' | 'Æ' => "ae",
    'ç' | 'Ç' | 'č' | 'Č' | 'ć' | 'Ć' => "c",
    'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' | 'ě' | 'Ě' | 'ę' | 'Ę' => "e",
    'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
    'ñ' | 'Ñ' | 'ń' | 'Ń' => "n",
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
    'œ' | 'Œ' => "oe",
    'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
    'ý' | 'ÿ' | 'Ý' | 'Ÿ' => "y",
    'ß' => "ss",
    'š' | 'Š' | 'ś' | 'Ś' => "s",
    'ž' | 'Ž' | 'ź' | 'Ź' | 'ż' | 'Ż' => "z",
    'ł' | 'Ł' => "l",
    _ => "",
  };
  let fallback = folded.is_empty().then_some(ch);
  folded.chars().chain(fallback)
}
