use chrono::{Datelike, Days, Months, NaiveDate};

/// `num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

#[cfg(test)]
pub fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    let first = date.checked_sub_days(Days::new(u64::from(date.day0())))?;
    first
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))
}

/// `count` consecutive month-ends strictly after `last`
pub fn month_ends_after(last: NaiveDate, count: usize) -> Option<Vec<NaiveDate>> {
    let mut out = Vec::with_capacity(count);
    let mut current = month_end(last)?;
    if current <= last {
        current = month_end(current.succ_opt()?)?;
    }
    while out.len() < count {
        out.push(current);
        current = month_end(current.succ_opt()?)?;
    }
    Some(out)
}

/// `count` consecutive days strictly after `last`
pub fn days_after(last: NaiveDate, count: usize) -> Option<Vec<NaiveDate>> {
    (1..=count as u64)
        .map(|offset| last.checked_add_days(Days::new(offset)))
        .collect()
}
