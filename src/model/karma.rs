use crate::{
    database::db_structs::KarmaAccount,
    model::{config::EngineConfig, error::EngineError}
};
use chrono::{DateTime, FixedOffset};

/// True iff the account is eligible for a regeneration credit right now:
/// the interval has elapsed and the balance is below the cap.
pub fn can_regen(account: &KarmaAccount, now: DateTime<FixedOffset>, config: &EngineConfig) -> bool {
    now >= account.last_regen_at + config.regen_interval && account.karma < config.max_karma
}

/// Whole minutes until the next regeneration becomes available, rounded
/// up so a rejection never reports zero minutes while seconds remain.
pub fn remaining_wait_minutes(
    account: &KarmaAccount,
    now: DateTime<FixedOffset>,
    config: &EngineConfig
) -> i64 {
    let remaining = (account.last_regen_at + config.regen_interval) - now;
    let seconds = remaining.num_seconds().max(0);

    (seconds + 59) / 60
}

/// Applies one regeneration credit, capped so the balance never
/// overshoots the maximum. Returns the amount credited.
pub fn regenerate(
    account: &mut KarmaAccount,
    now: DateTime<FixedOffset>,
    config: &EngineConfig
) -> Result<i32, EngineError> {
    if account.karma >= config.max_karma {
        return Err(EngineError::KarmaFull { current: account.karma });
    }

    if now < account.last_regen_at + config.regen_interval {
        return Err(EngineError::RegenTooEarly {
            remaining_minutes: remaining_wait_minutes(account, now, config)
        });
    }

    let credit = config.regen_amount.min(config.max_karma - account.karma);
    account.karma += credit;
    account.last_regen_at = now;

    Ok(credit)
}

/// Consumes karma for an action. Never drives the balance below zero;
/// the consuming action is rejected instead.
pub fn debit(account: &mut KarmaAccount, amount: i32) -> Result<(), EngineError> {
    if amount > account.karma {
        return Err(EngineError::InsufficientKarma {
            current: account.karma,
            required: amount
        });
    }

    account.karma -= amount;
    Ok(())
}
