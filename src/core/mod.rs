/// Exact ledger amounts and their stored form
pub mod amount;
/// Product catalog and approved-food entries
pub mod catalog;
/// Scan-time eligibility evaluation and size rules
pub mod eligibility;
/// Per-period benefit balances
pub mod ledger;
/// Product lookup collaborators
pub mod lookup;
/// Monthly rollover job
pub mod monthly;
/// Month periods and clocks
pub mod period;
/// Benefit reports
pub mod report;
/// Purchase recording and history
pub mod transaction;
/// Units, conversions and package-size parsing
pub mod units;
