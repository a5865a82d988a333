use crate::record::ScenarioRecord;

pub type CheckResult = Result<(), String>;

/// Everything produced arrived exactly once, in send order.
fn verify_delivery(record: &ScenarioRecord, expected: u32) -> CheckResult {
    if record.produced != expected {
        return Err(format!(
            "produced {} messages (expected {})",
            record.produced, expected
        ));
    }
    if record.malformed != 0 {
        return Err(format!("{} payloads were not sequence numbers", record.malformed));
    }
    if record.received.len() as u32 != expected {
        return Err(format!(
            "received {} messages (expected {})",
            record.received.len(),
            expected
        ));
    }
    if let Some((position, seq)) = record
        .received
        .iter()
        .enumerate()
        .find(|(position, seq)| **seq != *position as u32)
    {
        return Err(format!(
            "message {} arrived at position {} (FIFO violated)",
            seq, position
        ));
    }
    Ok(())
}

pub fn verify_flood(record: &ScenarioRecord, expected: u32) -> CheckResult {
    verify_delivery(record, expected)?;
    if record.rejected != 0 {
        return Err(format!(
            "flow control refused {} sends (expected 0)",
            record.rejected
        ));
    }
    Ok(())
}

/// Like [`verify_flood`], and the queue never grew past `depth_budget`.
pub fn verify_burst(record: &ScenarioRecord, expected: u32, depth_budget: u64) -> CheckResult {
    verify_flood(record, expected)?;
    if record.max_depth > depth_budget {
        return Err(format!(
            "queue depth {} exceeded budget {}",
            record.max_depth, depth_budget
        ));
    }
    Ok(())
}

/// Every message arrives in order and flow control pushed back at least once.
pub fn verify_backpressure(record: &ScenarioRecord, expected: u32) -> CheckResult {
    verify_delivery(record, expected)?;
    if record.rejected == 0 {
        return Err("backpressure scenario expected refused sends, observed none".into());
    }
    Ok(())
}
