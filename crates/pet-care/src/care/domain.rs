use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::error::CareError;

/// Marketplace user, as issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PetId(pub String);

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for adoption and care requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalkId(pub String);

/// Day of the recurring week. Ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    #[serde(alias = "mon")]
    Monday,
    #[serde(alias = "tue")]
    Tuesday,
    #[serde(alias = "wed")]
    Wednesday,
    #[serde(alias = "thu")]
    Thursday,
    #[serde(alias = "fri")]
    Friday,
    #[serde(alias = "sat")]
    Saturday,
    #[serde(alias = "sun")]
    Sunday,
}

impl DayOfWeek {
    pub const fn label(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const SLOT_GRANULARITY_MINUTES: u16 = 15;
const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time of day aligned to the quarter-hour grid, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    minutes: u16,
}

impl TimeSlot {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CareError> {
        let minutes = u16::from(hour) * 60 + u16::from(minute);
        if hour > 23 || minute > 59 || minute as u16 % SLOT_GRANULARITY_MINUTES != 0 {
            return Err(CareError::InvalidSlot(format!("{hour:02}:{minute:02}")));
        }
        debug_assert!(minutes < MINUTES_PER_DAY);
        Ok(Self { minutes })
    }

    pub fn hour(self) -> u8 {
        (self.minutes / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.minutes % 60) as u8
    }
}

impl FromStr for TimeSlot {
    type Err = CareError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| CareError::InvalidSlot(raw.to_string()))?;

        if parsed.second() != 0 || parsed.nanosecond() != 0 {
            return Err(CareError::InvalidSlot(raw.to_string()));
        }

        TimeSlot::new(parsed.hour() as u8, parsed.minute() as u8)
            .map_err(|_| CareError::InvalidSlot(raw.to_string()))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = CareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(value: TimeSlot) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// A single coordinate in the recurring weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeeklySlot {
    pub day: DayOfWeek,
    pub time: TimeSlot,
}

impl WeeklySlot {
    pub fn new(day: DayOfWeek, time: TimeSlot) -> Self {
        Self { day, time }
    }
}

impl fmt::Display for WeeklySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.time)
    }
}

/// Unvalidated slot as received from API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInput {
    pub day: DayOfWeek,
    pub time: String,
}

impl SlotInput {
    pub fn new(day: DayOfWeek, time: impl Into<String>) -> Self {
        Self {
            day,
            time: time.into(),
        }
    }

    pub fn validate(&self) -> Result<WeeklySlot, CareError> {
        Ok(WeeklySlot::new(self.day, self.time.parse()?))
    }
}

/// Validate a batch of client slots, failing on the first off-grid entry.
pub fn validate_slots(inputs: &[SlotInput]) -> Result<Vec<WeeklySlot>, CareError> {
    inputs.iter().map(SlotInput::validate).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Adopt,
    Care,
}

impl RequestKind {
    pub const fn label(self) -> &'static str {
        match self {
            RequestKind::Adopt => "adopt",
            RequestKind::Care => "care",
        }
    }
}

impl FromStr for RequestKind {
    type Err = CareError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "adopt" => Ok(RequestKind::Adopt),
            "care" => Ok(RequestKind::Care),
            _ => Err(CareError::InvalidType(raw.to_string())),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pets attached to a request.
///
/// Storage keeps the attachment as a many-to-many relation, but every request
/// the marketplace creates carries exactly one pet, so construction only
/// admits a single element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PetId>", into = "Vec<PetId>")]
pub struct PetSet {
    pets: BTreeSet<PetId>,
}

impl PetSet {
    pub fn single(pet: PetId) -> Self {
        let mut pets = BTreeSet::new();
        pets.insert(pet);
        Self { pets }
    }

    pub fn primary(&self) -> &PetId {
        // Construction guarantees exactly one element.
        self.pets
            .iter()
            .next()
            .unwrap_or_else(|| unreachable!("pet set is never empty"))
    }

    pub fn contains(&self, pet: &PetId) -> bool {
        self.pets.contains(pet)
    }
}

impl TryFrom<Vec<PetId>> for PetSet {
    type Error = String;

    fn try_from(value: Vec<PetId>) -> Result<Self, Self::Error> {
        let pets: BTreeSet<PetId> = value.into_iter().collect();
        if pets.len() == 1 {
            Ok(Self { pets })
        } else {
            Err(format!(
                "a request attaches exactly one pet, found {}",
                pets.len()
            ))
        }
    }
}

impl From<PetSet> for Vec<PetId> {
    fn from(value: PetSet) -> Self {
        value.pets.into_iter().collect()
    }
}

/// Validated caregiver rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, CareError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(CareError::InvalidRating(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = CareError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// One concrete weekly commitment produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWalk {
    pub id: WalkId,
    pub request_id: RequestId,
    pub caregiver_id: UserId,
    pub pet_id: PetId,
    pub day: DayOfWeek,
    pub time: TimeSlot,
}

impl ScheduledWalk {
    pub fn slot(&self) -> WeeklySlot {
        WeeklySlot::new(self.day, self.time)
    }
}

/// Stored review row, unique per reviewer/caregiver pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaregiverReview {
    pub reviewer_id: UserId,
    pub caregiver_id: UserId,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}
