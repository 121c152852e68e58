//! Canonical field names
//!
//! Every recognized CSV header variant is mapped onto one of these names.

// Train identity
pub const TRAIN_ID: &str = "trainID";
pub const TRAIN_NAME: &str = "trainname";
pub const CURRENT_DATE: &str = "current_date";

// Fitness
pub const ROLLING_STOCK_FITNESS_STATUS: &str = "rollingStockFitnessStatus";
pub const SIGNALLING_FITNESS_STATUS: &str = "signallingFitnessStatus";
pub const TELECOM_FITNESS_STATUS: &str = "telecomFitnessStatus";
pub const ROLLING_STOCK_FITNESS_EXPIRY_DATE: &str = "rollingStockFitnessExpiryDate";
pub const SIGNALLING_FITNESS_EXPIRY_DATE: &str = "signallingFitnessExpiryDate";
pub const TELECOM_FITNESS_EXPIRY_DATE: &str = "telecomFitnessExpiryDate";
pub const FITNESS_EXPIRY_DATE: &str = "fitnessExpiryDate";

// Job cards
pub const JOB_CARD_STATUS: &str = "jobCardStatus";
pub const OPEN_JOB_CARDS: &str = "openJobCards";
pub const CLOSED_JOB_CARDS: &str = "closedJobCards";
pub const LAST_JOB_CARD_UPDATE: &str = "lastJobCardUpdate";

// Branding
pub const BRANDING_ACTIVE: &str = "brandingActive";
pub const BRAND_CAMPAIGN_ID: &str = "brandCampaignID";
pub const EXPOSURE_HOURS_ACCRUED: &str = "exposureHoursAccrued";
pub const EXPOSURE_HOURS_TARGET: &str = "exposureHoursTarget";
pub const EXPOSURE_DAILY_QUOTA: &str = "exposureDailyQuota";

// Mileage
pub const TOTAL_MILEAGE_KM: &str = "totalMileageKM";
pub const MILEAGE_SINCE_LAST_SERVICE_KM: &str = "mileageSinceLastServiceKM";
pub const MILEAGE_BALANCE_VARIANCE: &str = "mileageBalanceVariance";
pub const BRAKEPAD_WEAR_PERCENT: &str = "brakepadWearPercent";
pub const HVAC_WEAR_PERCENT: &str = "hvacWearPercent";

// Cleaning
pub const CLEANING_REQUIRED: &str = "cleaningRequired";
pub const CLEANING_SLOT_STATUS: &str = "cleaningSlotStatus";
pub const BAY_OCCUPANCY_IDC: &str = "bayOccupancyIDC";
pub const CLEANING_CREW_ASSIGNED: &str = "cleaningCrewAssigned";
pub const LAST_CLEANED_DATE: &str = "lastCleanedDate";

// Stabling
pub const BAY_POSITION_ID: &str = "bayPositionID";
pub const SHUNTING_MOVES_REQUIRED: &str = "shuntingMovesRequired";
pub const STABLING_SEQUENCE_ORDER: &str = "stablingSequenceOrder";

// Operations
pub const OPERATIONAL_STATUS: &str = "operationalStatus";
pub const REASON_FOR_STATUS: &str = "reasonForStatus";
pub const RANK: &str = "rank";
pub const SCORE: &str = "score";
pub const RL_PRIORITY: &str = "rl_priority";

/// Fields coerced through the tolerant boolean grammar
pub const BOOLEAN_FIELDS: &[&str] = &[
    ROLLING_STOCK_FITNESS_STATUS,
    SIGNALLING_FITNESS_STATUS,
    TELECOM_FITNESS_STATUS,
    BRANDING_ACTIVE,
    CLEANING_REQUIRED,
];

/// Fields coerced through the flexible date grammar
pub const DATE_FIELDS: &[&str] = &[
    CURRENT_DATE,
    ROLLING_STOCK_FITNESS_EXPIRY_DATE,
    SIGNALLING_FITNESS_EXPIRY_DATE,
    TELECOM_FITNESS_EXPIRY_DATE,
    FITNESS_EXPIRY_DATE,
    LAST_JOB_CARD_UPDATE,
    LAST_CLEANED_DATE,
];

// Signal fields: a sub-profile is upserted only if the row carries one of these.
pub const FITNESS_SIGNALS: &[&str] = &[
    ROLLING_STOCK_FITNESS_STATUS,
    SIGNALLING_FITNESS_STATUS,
    TELECOM_FITNESS_STATUS,
];
pub const JOB_CARD_SIGNALS: &[&str] = &[JOB_CARD_STATUS];
pub const BRANDING_SIGNALS: &[&str] = &[BRANDING_ACTIVE];
pub const MILEAGE_SIGNALS: &[&str] = &[TOTAL_MILEAGE_KM];
pub const CLEANING_SIGNALS: &[&str] = &[CLEANING_REQUIRED];
pub const STABLING_SIGNALS: &[&str] = &[BAY_POSITION_ID];
pub const OPERATIONS_SIGNALS: &[&str] = &[OPERATIONAL_STATUS, RANK, SCORE, REASON_FOR_STATUS, RL_PRIORITY];
