//! Header canonicalization
//!
//! A raw header is reduced to lowercase alphanumerics, looked up in an exact
//! alias table, then run through an ordered rule table. Unrecognized headers
//! pass through in their reduced form.

use super::fields::*;

/// Exact aliases of reduced headers
const ALIASES: &[(&str, &str)] = &[
    ("trainname", TRAIN_NAME),
    ("train", TRAIN_NAME),
    ("trainid", TRAIN_ID),
    ("currentdate", CURRENT_DATE),
    ("rollingstockfitnessstatus", ROLLING_STOCK_FITNESS_STATUS),
    ("signallingfitnessstatus", SIGNALLING_FITNESS_STATUS),
    ("telecomfitnessstatus", TELECOM_FITNESS_STATUS),
    ("rollingstockfitnessexpirydate", ROLLING_STOCK_FITNESS_EXPIRY_DATE),
    ("signallingfitnessexpirydate", SIGNALLING_FITNESS_EXPIRY_DATE),
    ("telecomfitnessexpirydate", TELECOM_FITNESS_EXPIRY_DATE),
    ("fitnessexpirydate", FITNESS_EXPIRY_DATE),
    ("jobcardstatus", JOB_CARD_STATUS),
    ("openjobcards", OPEN_JOB_CARDS),
    ("closedjobcards", CLOSED_JOB_CARDS),
    ("lastjobcardupdate", LAST_JOB_CARD_UPDATE),
    ("brandingactive", BRANDING_ACTIVE),
    ("brandcampaignid", BRAND_CAMPAIGN_ID),
    ("exposurehoursaccrued", EXPOSURE_HOURS_ACCRUED),
    ("exposurehourstarget", EXPOSURE_HOURS_TARGET),
    ("exposuredailyquota", EXPOSURE_DAILY_QUOTA),
    ("totalmileagekm", TOTAL_MILEAGE_KM),
    ("mileagesincelastservicekm", MILEAGE_SINCE_LAST_SERVICE_KM),
    ("mileagebalancevariance", MILEAGE_BALANCE_VARIANCE),
    ("brakepadwear", BRAKEPAD_WEAR_PERCENT),
    ("hvacwear", HVAC_WEAR_PERCENT),
    ("cleaningrequired", CLEANING_REQUIRED),
    ("cleaningslotstatus", CLEANING_SLOT_STATUS),
    ("bayoccupancyidc", BAY_OCCUPANCY_IDC),
    ("cleaningcrewassigned", CLEANING_CREW_ASSIGNED),
    ("lastcleaneddate", LAST_CLEANED_DATE),
    ("baypositionid", BAY_POSITION_ID),
    ("shuntingmovesrequired", SHUNTING_MOVES_REQUIRED),
    ("stablingsequenceorder", STABLING_SEQUENCE_ORDER),
    ("operationalstatus", OPERATIONAL_STATUS),
    ("reasonforstatus", REASON_FOR_STATUS),
    ("rank", RANK),
    ("score", SCORE),
    ("rlpriority", RL_PRIORITY),
];

/// Substring rule: matches when the reduced header contains every `all_of`
/// fragment and none of the `none_of` fragments
#[derive(Debug, Clone, Copy)]
pub struct HeaderRule {
    pub all_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
    pub canonical: &'static str,
}

impl HeaderRule {
    const fn new(all_of: &'static [&'static str], canonical: &'static str) -> Self {
        Self {
            all_of,
            none_of: &[],
            canonical,
        }
    }

    const fn excluding(mut self, none_of: &'static [&'static str]) -> Self {
        self.none_of = none_of;
        self
    }

    pub fn matches(&self, header: &str) -> bool {
        self.all_of.iter().all(|f| header.contains(f))
            && !self.none_of.iter().any(|f| header.contains(f))
    }
}

/// Ordered heuristics; the first matching rule wins
pub const HEADER_RULES: &[HeaderRule] = &[
    HeaderRule::new(&["trainid"], TRAIN_ID).excluding(&["fitness"]),
    HeaderRule::new(&["trainname"], TRAIN_NAME).excluding(&["fitness"]),
    HeaderRule::new(&["currentdate"], CURRENT_DATE),
    HeaderRule::new(&["rolling", "fitness", "expiry"], ROLLING_STOCK_FITNESS_EXPIRY_DATE),
    HeaderRule::new(&["signalling", "fitness", "expiry"], SIGNALLING_FITNESS_EXPIRY_DATE),
    HeaderRule::new(&["telecom", "fitness", "expiry"], TELECOM_FITNESS_EXPIRY_DATE),
    HeaderRule::new(&["fitness", "expiry"], FITNESS_EXPIRY_DATE),
    HeaderRule::new(&["rolling", "fitness"], ROLLING_STOCK_FITNESS_STATUS),
    HeaderRule::new(&["signalling", "fitness"], SIGNALLING_FITNESS_STATUS),
    HeaderRule::new(&["telecom", "fitness"], TELECOM_FITNESS_STATUS),
    HeaderRule::new(&["job", "status"], JOB_CARD_STATUS).excluding(&["card"]),
    HeaderRule::new(&["open", "job"], OPEN_JOB_CARDS),
    HeaderRule::new(&["closed", "job"], CLOSED_JOB_CARDS),
    HeaderRule::new(&["last", "job", "update"], LAST_JOB_CARD_UPDATE),
    HeaderRule::new(&["branding", "active"], BRANDING_ACTIVE),
    HeaderRule::new(&["brand", "campaign"], BRAND_CAMPAIGN_ID),
    HeaderRule::new(&["exposure", "accrued"], EXPOSURE_HOURS_ACCRUED),
    HeaderRule::new(&["exposure", "target"], EXPOSURE_HOURS_TARGET),
    HeaderRule::new(&["daily", "quota"], EXPOSURE_DAILY_QUOTA),
    HeaderRule::new(&["total", "mileage"], TOTAL_MILEAGE_KM),
    HeaderRule::new(&["since", "service"], MILEAGE_SINCE_LAST_SERVICE_KM),
    HeaderRule::new(&["balance", "variance"], MILEAGE_BALANCE_VARIANCE),
    HeaderRule::new(&["brake", "wear"], BRAKEPAD_WEAR_PERCENT),
    HeaderRule::new(&["hvac", "wear"], HVAC_WEAR_PERCENT),
    HeaderRule::new(&["cleaning", "required"], CLEANING_REQUIRED),
    HeaderRule::new(&["cleaning", "slot"], CLEANING_SLOT_STATUS),
    HeaderRule::new(&["bay", "occupancy"], BAY_OCCUPANCY_IDC),
    HeaderRule::new(&["crew", "assigned"], CLEANING_CREW_ASSIGNED),
    HeaderRule::new(&["last", "clean"], LAST_CLEANED_DATE),
    HeaderRule::new(&["bay", "position"], BAY_POSITION_ID),
    HeaderRule::new(&["shunting", "moves"], SHUNTING_MOVES_REQUIRED),
    HeaderRule::new(&["stabling", "sequence"], STABLING_SEQUENCE_ORDER),
    HeaderRule::new(&["operational", "status"], OPERATIONAL_STATUS),
    HeaderRule::new(&["reason", "status"], REASON_FOR_STATUS),
    HeaderRule::new(&["rl", "priority"], RL_PRIORITY),
];

/// Trim, lowercase and drop every non-alphanumeric character
pub fn reduce_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Map a raw header onto its canonical field name
pub fn canonical_header(header: &str) -> String {
    let reduced = reduce_header(header);

    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == reduced) {
        return (*canonical).to_string();
    }

    HEADER_RULES
        .iter()
        .find(|rule| rule.matches(&reduced))
        .map(|rule| rule.canonical.to_string())
        .unwrap_or(reduced)
}
