//! Free-text reminder grammar.
//!
//! Recognizes a schedule clause of the form
//! `(in|on|next|every) <interval> <day-spec> (at <time>)?` anywhere in the
//! request; once the clause is stripped, the remainder must read
//! `remind (me|team|here|room) (to)? <message>`.
//!
//! Implemented as a small hand-written token scanner rather than a regex:
//! every alternative is a method on [`ClauseParser`] with explicit
//! backtracking, which keeps the odd corners of the grammar (weekday
//! abbreviations, the Sunday fallback, 12-hour arithmetic) visible and
//! testable.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::reminder::error::ParseError;
use crate::reminder::types::{Audience, JobDefinition, JobKind, RecurrenceSpec};

/// Successful parse of a full reminder request.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub definition: JobDefinition,
    pub audience: Audience,
    pub message: String,
}

/// Parse a full reminder request ("remind me every Friday at 9 to ...").
///
/// Wall-clock arithmetic happens in `tz`; the resulting spec and first
/// occurrence are normalized to UTC before they leave this function.
pub fn parse(text: &str, tz: Tz, now: DateTime<Utc>) -> Result<Parsed, ParseError> {
    let (orig, norm) = tokenize(text);
    if norm.is_empty() {
        return Err(ParseError::NoScheduleClause(text.to_string()));
    }

    // The clause may sit before, after, or inside the reminder body. Scan
    // left to right and take the first position where a clause parses.
    let mut found: Option<(usize, usize, Clause)> = None;
    for start in 0..norm.len() {
        if !is_clause_keyword(&norm[start]) {
            continue;
        }
        let mut p = ClauseParser::new(&norm[start..]);
        if let Some(clause) = p.parse_clause() {
            found = Some((start, start + p.pos, clause));
            break;
        }
    }
    let (start, end, clause) =
        found.ok_or_else(|| ParseError::NoScheduleClause(text.to_string()))?;

    // Remainder: remind (me|team|here|room) (to)? <message>
    let rest: Vec<&str> = orig[..start]
        .iter()
        .chain(orig[end..].iter())
        .copied()
        .collect();
    let rest_norm: Vec<&str> = norm[..start]
        .iter()
        .chain(norm[end..].iter())
        .map(String::as_str)
        .collect();

    if rest_norm.first() != Some(&"remind") {
        return Err(ParseError::MissingMessage);
    }
    let audience = match rest_norm.get(1).copied() {
        Some("me") => Audience::Me,
        Some("team") => Audience::Team,
        Some("here") => Audience::Here,
        Some("room") => Audience::Room,
        _ => return Err(ParseError::MissingMessage),
    };
    let body_start = if rest_norm.get(2).copied() == Some("to") {
        3
    } else {
        2
    };
    let message = rest[body_start..].join(" ");
    if message.is_empty() {
        return Err(ParseError::MissingMessage);
    }

    Ok(Parsed {
        definition: realize(&clause, tz, now),
        audience,
        message,
    })
}

/// Parse a bare schedule clause ("every other Tuesday at 16:33"), as used
/// when updating the schedule of an existing job. The whole input must be
/// consumed by the clause.
pub fn parse_spec(text: &str, tz: Tz, now: DateTime<Utc>) -> Result<JobDefinition, ParseError> {
    let (_, norm) = tokenize(text);
    if norm.is_empty() || !is_clause_keyword(&norm[0]) {
        return Err(ParseError::NoScheduleClause(text.to_string()));
    }
    let mut p = ClauseParser::new(&norm);
    match p.parse_clause() {
        Some(clause) if p.pos == norm.len() => Ok(realize(&clause, tz, now)),
        _ => Err(ParseError::NoScheduleClause(text.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tokenization & word tables
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> (Vec<&str>, Vec<String>) {
    let mut orig = Vec::new();
    let mut norm = Vec::new();
    for tok in text.split_whitespace() {
        let n = tok
            .trim_matches(|c| matches!(c, ',' | '.' | '!' | '?' | ';'))
            .to_lowercase();
        if n.is_empty() {
            continue;
        }
        orig.push(tok);
        norm.push(n);
    }
    (orig, norm)
}

fn is_clause_keyword(tok: &str) -> bool {
    matches!(tok, "in" | "on" | "next" | "every")
}

const WEEKDAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Words the grammar itself owns; never candidates for weekday resolution.
const RESERVED_WORDS: [&str; 24] = [
    "in", "on", "next", "every", "at", "to", "am", "pm", "and", "or", "remind", "me", "team",
    "here", "room", "other", "second", "third", "fourth", "fifth", "minute", "hour", "day",
    "week",
];

/// Resolve a token to a weekday index (0 = Sunday .. 6 = Saturday).
///
/// Accepts any unambiguous prefix of a weekday name (plural "s" tolerated)
/// and the abbreviation table M/Tu/W/Th/F/Sa/Su. A short token (two letters
/// or fewer) that matches nothing resolves to Sunday — the original grammar
/// behaves this way, so "every T" silently means Sunday. Longer unmatched
/// tokens are not weekdays at all.
fn resolve_weekday(tok: &str) -> Option<u8> {
    if tok.is_empty()
        || !tok.chars().all(|c| c.is_ascii_alphabetic())
        || RESERVED_WORDS.contains(&tok)
    {
        return None;
    }
    match tok {
        "m" => return Some(1),
        "tu" => return Some(2),
        "w" => return Some(3),
        "th" => return Some(4),
        "f" => return Some(5),
        "sa" => return Some(6),
        "su" => return Some(0),
        _ => {}
    }
    let stem = match tok.strip_suffix('s') {
        Some(s) if s.len() >= 3 => s,
        _ => tok,
    };
    let mut matched = None;
    let mut count = 0;
    for (i, name) in WEEKDAY_NAMES.iter().enumerate() {
        if name.starts_with(stem) {
            matched = Some(i as u8);
            count += 1;
        }
    }
    match count {
        1 => matched,
        _ if tok.len() <= 2 => Some(0), // documented Sunday fallback
        _ => None,
    }
}

fn parse_count(tok: &str) -> Option<u32> {
    if !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()) {
        return tok.parse().ok();
    }
    let words = [
        ("one", 1),
        ("two", 2),
        ("three", 3),
        ("four", 4),
        ("five", 5),
        ("six", 6),
        ("seven", 7),
        ("eight", 8),
        ("nine", 9),
        ("ten", 10),
    ];
    words
        .iter()
        .find(|(w, _)| *w == tok)
        .map(|(_, n)| *n)
}

/// "5", "5th", "2nd", "31st", "3rd".
fn parse_ordinal(tok: &str) -> Option<u32> {
    if tok.chars().all(|c| c.is_ascii_digit()) {
        return tok.parse().ok().filter(|n| *n > 0);
    }
    let digits = tok
        .strip_suffix("st")
        .or_else(|| tok.strip_suffix("nd"))
        .or_else(|| tok.strip_suffix("rd"))
        .or_else(|| tok.strip_suffix("th"))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// Clause parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    kind: ClauseKind,
    time: Option<(u8, u8)>,
}

#[derive(Debug, Clone, PartialEq)]
enum ClauseKind {
    /// `in N <unit>`, optionally composed with a day-of-week.
    Offset { offset: Duration, days: Vec<u8> },
    /// `on <weekday>` / `next <weekday>`.
    NextDay { days: Vec<u8> },
    Every(EveryKind),
}

#[derive(Debug, Clone, PartialEq)]
enum EveryKind {
    Weekly { days: Vec<u8>, interval: u32 },
    Monthly { day_of_month: u8 },
}

struct ClauseParser<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> ClauseParser<'a> {
    fn new(toks: &'a [String]) -> Self {
        Self { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.toks.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<&'a str> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, word: &str) -> bool {
        if self.peek() == Some(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_clause(&mut self) -> Option<Clause> {
        match self.peek()? {
            "in" => self.parse_in(),
            "on" | "next" => self.parse_next_day(),
            "every" => self.parse_every(),
            _ => None,
        }
    }

    fn parse_in(&mut self) -> Option<Clause> {
        self.bump(); // "in"
        let count = parse_count(self.bump()?)? as i64;
        let offset = match self.bump()? {
            "minute" | "minutes" => Duration::minutes(count),
            "hour" | "hours" => Duration::hours(count),
            "day" | "days" => Duration::days(count),
            "week" | "weeks" => Duration::weeks(count),
            _ => return None,
        };

        // Optional trailing pieces in either order: a day-of-week (composes
        // additively with the offset) and an at-time.
        let mut days = Vec::new();
        let mut time = None;
        loop {
            if time.is_none() {
                if let Some(t) = self.parse_time() {
                    time = Some(t);
                    continue;
                }
            }
            if days.is_empty() {
                if let Some(list) = self.parse_day_part() {
                    days = list;
                    continue;
                }
            }
            break;
        }
        Some(Clause {
            kind: ClauseKind::Offset { offset, days },
            time,
        })
    }

    fn parse_next_day(&mut self) -> Option<Clause> {
        self.bump(); // "on" | "next"
        let days = self.parse_day_list()?;
        let time = self.parse_time();
        Some(Clause {
            kind: ClauseKind::NextDay { days },
            time,
        })
    }

    fn parse_every(&mut self) -> Option<Clause> {
        self.bump(); // "every"
        let interval_word = match self.peek()? {
            "other" | "second" => Some(2),
            "third" => Some(3),
            "fourth" => Some(4),
            "fifth" => Some(5),
            _ => None,
        };

        let kind = if let Some(interval) = interval_word {
            self.bump();
            let days = self.parse_day_list()?;
            EveryKind::Weekly { days, interval }
        } else if let Some(n) = self.peek().and_then(parse_ordinal) {
            self.bump();
            if let Some(days) = self.parse_day_list() {
                EveryKind::Weekly { days, interval: n }
            } else {
                // Bare "every 5"/"every 5th": monthly on that day-of-month.
                if !(1..=31).contains(&n) {
                    return None;
                }
                EveryKind::Monthly {
                    day_of_month: n as u8,
                }
            }
        } else {
            let days = self.parse_day_list()?;
            EveryKind::Weekly { days, interval: 1 }
        };

        let time = self.parse_time();
        Some(Clause {
            kind: ClauseKind::Every(kind),
            time,
        })
    }

    /// `(on|next)? <day-list>`, backtracking fully when no day follows.
    fn parse_day_part(&mut self) -> Option<Vec<u8>> {
        let save = self.pos;
        if matches!(self.peek(), Some("on") | Some("next")) {
            self.bump();
        }
        match self.parse_day_list() {
            Some(days) => Some(days),
            None => {
                self.pos = save;
                None
            }
        }
    }

    /// One or more weekdays, separated by "and"/"or" (commas are stripped
    /// during tokenization). `weekday`/`weekdays` expands to Mon-Fri.
    fn parse_day_list(&mut self) -> Option<Vec<u8>> {
        if matches!(self.peek()?, "weekday" | "weekdays") {
            self.bump();
            return Some(vec![1, 2, 3, 4, 5]);
        }
        let first = resolve_weekday(self.peek()?)?;
        self.bump();
        let mut days = vec![first];
        loop {
            let save = self.pos;
            if matches!(self.peek(), Some("and") | Some("or")) {
                self.bump();
            }
            match self.peek().and_then(resolve_weekday) {
                Some(d) => {
                    self.bump();
                    days.push(d);
                }
                None => {
                    self.pos = save;
                    break;
                }
            }
        }
        Some(days)
    }

    /// `at H`, `at H:MM`, `at HhMM`, with optional attached or detached
    /// am/pm. 12-hour arithmetic: pm adds 12 unless the hour already is.
    fn parse_time(&mut self) -> Option<(u8, u8)> {
        let save = self.pos;
        if !self.eat("at") {
            return None;
        }
        let Some(tok) = self.bump() else {
            self.pos = save;
            return None;
        };

        let (body, mut pm) = if let Some(b) = tok.strip_suffix("pm") {
            (b, Some(true))
        } else if let Some(b) = tok.strip_suffix("am") {
            (b, Some(false))
        } else {
            (tok, None)
        };
        if pm.is_none() {
            match self.peek() {
                Some("pm") => {
                    self.bump();
                    pm = Some(true);
                }
                Some("am") => {
                    self.bump();
                    pm = Some(false);
                }
                _ => {}
            }
        }

        let Some((mut hour, minute)) = parse_hhmm(body) else {
            self.pos = save;
            return None;
        };
        if pm == Some(true) && hour < 12 {
            hour += 12;
        }
        Some((hour as u8, minute as u8))
    }
}

fn parse_hhmm(body: &str) -> Option<(u32, u32)> {
    let (h, m) = match body.split_once(':').or_else(|| body.split_once('h')) {
        Some((h, m)) => (h, m),
        None => (body, ""),
    };
    if h.is_empty() || !h.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = if m.is_empty() {
        0
    } else {
        if !m.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        m.parse().ok()?
    };
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

// ---------------------------------------------------------------------------
// Realization: clause -> UTC-normalized definition
// ---------------------------------------------------------------------------

fn realize(clause: &Clause, tz: Tz, now: DateTime<Utc>) -> JobDefinition {
    let now_local = now.with_timezone(&tz);
    match &clause.kind {
        ClauseKind::Offset { offset, days } => {
            let mut target = now_local + *offset;
            if let Some((h, m)) = clause.time {
                target = local_datetime(tz, target.date_naive(), h, m);
            }
            if !days.is_empty() {
                let days = normalize_days(days);
                for i in 0..=7 {
                    let cand = shift_local_days(tz, target, i);
                    if days.contains(&date_dow(cand.date_naive())) && cand > now_local {
                        target = cand;
                        break;
                    }
                }
            }
            finish_single(days, target)
        }
        ClauseKind::NextDay { days } => {
            let (h, m) = clause.time.unwrap_or((0, 0));
            let days_local = normalize_days(days);
            let target = first_weekly_local(tz, now_local, &days_local, h, m);
            finish_single(days, target)
        }
        ClauseKind::Every(EveryKind::Weekly { days, interval }) => {
            let (h, m) = clause.time.unwrap_or((0, 0));
            let days_local = normalize_days(days);
            let first = first_weekly_local(tz, now_local, &days_local, h, m);
            let first_utc = truncate_seconds(first.with_timezone(&Utc));
            let days_utc = shift_days(&days_local, day_shift(&first, first_utc));
            JobDefinition {
                kind: JobKind::Recurring,
                spec: RecurrenceSpec::Weekly {
                    days: days_utc,
                    interval: (*interval).max(1),
                    hour: first_utc.hour() as u8,
                    minute: first_utc.minute() as u8,
                },
                next: first_utc,
            }
        }
        ClauseKind::Every(EveryKind::Monthly { day_of_month }) => {
            let (h, m) = clause.time.unwrap_or((0, 0));
            let today = now_local.date_naive();
            let this_month = monthly_date(today.year(), today.month(), *day_of_month);
            let cand = local_datetime(tz, this_month, h, m);
            let target = if cand > now_local {
                cand
            } else {
                let (y, mo) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                local_datetime(tz, monthly_date(y, mo, *day_of_month), h, m)
            };
            let target_utc = truncate_seconds(target.with_timezone(&Utc));
            // Day-of-month is kept as the user gave it; only the time of day
            // is normalized to UTC.
            JobDefinition {
                kind: JobKind::Recurring,
                spec: RecurrenceSpec::Monthly {
                    day_of_month: *day_of_month,
                    hour: target_utc.hour() as u8,
                    minute: target_utc.minute() as u8,
                },
                next: target_utc,
            }
        }
    }
}

fn finish_single(days_local: &[u8], target: DateTime<Tz>) -> JobDefinition {
    let target_utc = truncate_seconds(target.with_timezone(&Utc));
    let days_utc = if days_local.is_empty() {
        vec![date_dow(target_utc.date_naive())]
    } else {
        shift_days(&normalize_days(days_local), day_shift(&target, target_utc))
    };
    JobDefinition {
        kind: JobKind::Single,
        spec: RecurrenceSpec::SingleShot {
            days: days_utc,
            hour: target_utc.hour() as u8,
            minute: target_utc.minute() as u8,
        },
        next: target_utc,
    }
}

/// First local occurrence of `days` at `h:m` strictly after `now_local`;
/// today counts when the time of day has not yet passed.
fn first_weekly_local(
    tz: Tz,
    now_local: DateTime<Tz>,
    days: &[u8],
    h: u8,
    m: u8,
) -> DateTime<Tz> {
    for i in 0..=7 {
        let date = now_local.date_naive() + Duration::days(i);
        if !days.contains(&date_dow(date)) {
            continue;
        }
        let cand = local_datetime(tz, date, h, m);
        if cand > now_local {
            return cand;
        }
    }
    // Unreachable with a non-empty day set; land a week out as a safety net.
    local_datetime(tz, now_local.date_naive() + Duration::days(7), h, m)
}

fn monthly_date(year: i32, month: u32, dom: u8) -> NaiveDate {
    let dom = (dom as u32).clamp(1, 31).min(crate::reminder::recur::days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, dom)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default())
}

fn normalize_days(days: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = days.iter().map(|d| d % 7).collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Calendar-day delta introduced by the UTC conversion (-1, 0, or +1).
fn day_shift(local: &DateTime<Tz>, utc: DateTime<Utc>) -> i8 {
    (utc.date_naive() - local.date_naive()).num_days() as i8
}

fn shift_days(days: &[u8], shift: i8) -> Vec<u8> {
    let mut out: Vec<u8> = days
        .iter()
        .map(|d| (*d as i8 + shift).rem_euclid(7) as u8)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn date_dow(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn local_datetime(tz: Tz, date: NaiveDate, hour: u8, minute: u8) -> DateTime<Tz> {
    let naive = date
        .and_hms_opt(hour.min(23) as u32, minute.min(59) as u32, 0)
        .unwrap_or_else(|| date.and_hms_opt(0, 0, 0).unwrap_or_default());
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Spring-forward gap: slide an hour later and retry.
        LocalResult::None => match tz.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => tz.from_utc_datetime(&naive),
        },
    }
}

/// Advance a local instant by whole calendar days, re-resolving the wall
/// clock so DST transitions don't smear the time of day.
fn shift_local_days(tz: Tz, dt: DateTime<Tz>, days: i64) -> DateTime<Tz> {
    local_datetime(
        tz,
        dt.date_naive() + Duration::days(days),
        dt.hour() as u8,
        dt.minute() as u8,
    )
}

fn truncate_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}
