use std::sync::LazyLock;

use regex::Regex;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(工程師|Developer|Engineer|設計|Designer|Manager|Product|行銷|Marketing|PM|資料|Data|Frontend|Backend|Full ?Stack|iOS|Android|QA|DevOps)",
    )
    .unwrap()
});
static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(股份有限公司|有限公司|公司|Studio|Team|Inc\.?|Co\.?|Limited|Ltd\.?)").unwrap()
});
static ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]").unwrap());
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").unwrap());
static SALARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(月|年|萬|k|K|NT|薪|面議|USD)").unwrap());
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(市|區|縣|台北|新北|桃園|台中|台南|高雄|Hsinchu|Taipei|Remote|遠端)").unwrap()
});
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const SHORT_COMPANY_MAX_CHARS: usize = 20;

/// The free-text fields the classifier fills. Unmatched fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedFields {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
}

/// Split rendered element text into trimmed, whitespace-collapsed lines,
/// dropping blanks and repeats (first occurrence wins).
pub fn fragments(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = collapse_whitespace(line);
        if !line.is_empty() && !out.contains(&line) {
            out.push(line);
        }
    }
    out
}

pub fn collapse_whitespace(s: &str) -> String {
    SPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Assign fragments to fields by ranked first-match rules.
pub fn classify<S: AsRef<str>>(fragments: &[S]) -> ClassifiedFields {
    let lines: Vec<&str> = fragments.iter().map(AsRef::as_ref).collect();

    let title_idx = lines
        .iter()
        .position(|l| TITLE_RE.is_match(l))
        .or(if lines.is_empty() { None } else { Some(0) });

    let company = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != title_idx)
        .map(|(_, l)| *l)
        .find(|l| is_company_like(l));

    let salary = lines
        .iter()
        .find(|l| DIGIT_RE.is_match(l) && SALARY_RE.is_match(l));

    let location = lines.iter().find(|l| LOCATION_RE.is_match(l));

    ClassifiedFields {
        title: title_idx.map(|i| lines[i].to_string()).unwrap_or_default(),
        company: company.unwrap_or_default().to_string(),
        location: location.map(|l| l.to_string()).unwrap_or_default(),
        salary: salary.map(|l| l.to_string()).unwrap_or_default(),
    }
}

fn is_company_like(line: &str) -> bool {
    COMPANY_RE.is_match(line)
        || (line.chars().count() <= SHORT_COMPANY_MAX_CHARS && ALNUM_RE.is_match(line))
}

// ── Tests ──
