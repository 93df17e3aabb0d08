/// Maximum valid year (inclusive)
pub const MAX_YEAR: u16 = 9999;

/// Number of digits a year must be written with
pub const YEAR_DIGITS: usize = 4;

/// Maximum valid month (December)
pub const MAX_MONTH: u8 = 12;

/// Months in a year
pub const MONTHS_PER_YEAR: u32 = 12;

/// Month number for February
pub const FEBRUARY: u8 = 2;

/// Days in February for leap years
pub const FEBRUARY_DAYS_LEAP: u8 = 29;

/// Maximum days in each month (index 0 is unused, months are 1-indexed)
/// February shows 28 days (non-leap year default)
pub const DAYS_IN_MONTH: [u8; 13] = [
    0,  // index 0 unused (months are 1-indexed)
    31, // January
    28, // February (non-leap, adjusted by is_leap_year check)
    31, // March
    30, // April
    31, // May
    30, // June
    31, // July
    31, // August
    30, // September
    31, // October
    30, // November
    31, // December
];

/// Full English month names, 1-indexed like `DAYS_IN_MONTH`
pub const MONTH_NAMES: [&str; 13] = [
    "",
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Shortest prefix accepted as a month abbreviation ("Jan", "Sept")
pub const MONTH_ABBREVIATION_LEN: usize = 3;

/// Leap year occurs every 4 years
pub(crate) const LEAP_YEAR_CYCLE: u16 = 4;
/// Century years are not leap years unless...
pub(crate) const CENTURY_CYCLE: u16 = 100;
/// ...they are divisible by 400 (Gregorian calendar correction)
pub(crate) const GREGORIAN_CYCLE: u16 = 400;

/// Accepted date component separators; components are month-first unless
/// the first one is a 4-digit year
pub const MONTH_FIRST_SEPARATORS: [char; 3] = ['/', '-', '.'];

/// The follow-up is due this many months before the qualifying renewal
pub const FOLLOW_UP_LEAD_MONTHS: u8 = 3;

/// Notice text preceding the certificate expiration date
pub const NOTICE_PREFIX: &str =
    "Please follow-up for a new accident prevention course certificate. The current certificate expires ";

/// Age at which a driver moves into the older bracket
pub const AGE_BRACKET_THRESHOLD: u8 = 55;

/// Revision the built-in rule table is pinned to
pub const STANDARD_RULE_REVISION: u32 = 6;

/// Environment variable naming a TOML rule table to load
pub const RULES_ENV_VAR: &str = "DISC_FOLLOW_UP_RULES";
