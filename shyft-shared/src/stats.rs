/// Dashboard aggregation
///
/// The dashboard endpoints load a company's jobs and technicians once and
/// fold them here. Revenue only counts `completed` jobs; month boundaries are
/// UTC calendar months keyed on `completed_at`.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use shyft_shared::stats::{dashboard_stats, revenue_chart};
///
/// let stats = dashboard_stats(&[], &[], Utc::now());
/// assert_eq!(stats.total_jobs, 0);
///
/// let chart = revenue_chart(&[], 3, Utc::now());
/// assert_eq!(chart.len(), 3);
/// ```

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};
use crate::models::technician::{TechnicianStatus, TechnicianWithProfile};

/// Default number of months on the revenue chart
pub const DEFAULT_CHART_MONTHS: u32 = 6;

/// Longest revenue chart served
pub const MAX_CHART_MONTHS: u32 = 24;

/// Headline numbers for a company
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_jobs: usize,
    pub pending_jobs: usize,
    /// Jobs `assigned` or `in_progress`
    pub active_jobs: usize,
    pub completed_jobs: usize,
    pub total_technicians: usize,
    pub available_technicians: usize,
    /// Sum of `amount` over completed jobs
    pub total_revenue: f64,
    /// Same sum, completed this UTC calendar month
    pub monthly_revenue: f64,
}

/// A technician with their open workload
#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    #[serde(flatten)]
    pub technician: TechnicianWithProfile,

    /// Jobs `assigned` or `in_progress` for this technician
    pub active_jobs: usize,
}

/// One month of the revenue chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueBucket {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: f64,
    /// Completed jobs in the month
    pub jobs: usize,
}

/// Months since year 0, so consecutive months differ by one
fn month_index<T: Datelike>(date: &T) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn completed_revenue(job: &Job) -> Option<(Option<DateTime<Utc>>, f64)> {
    (job.status == JobStatus::Completed).then(|| (job.completed_at, job.amount.unwrap_or(0.0)))
}

/// Computes the headline dashboard numbers
pub fn dashboard_stats(
    jobs: &[Job],
    technicians: &[TechnicianWithProfile],
    now: DateTime<Utc>,
) -> DashboardStats {
    let current_month = month_index(&now);

    let mut stats = DashboardStats {
        total_jobs: jobs.len(),
        pending_jobs: 0,
        active_jobs: 0,
        completed_jobs: 0,
        total_technicians: technicians.len(),
        available_technicians: technicians
            .iter()
            .filter(|t| t.technician.status == TechnicianStatus::Available)
            .count(),
        total_revenue: 0.0,
        monthly_revenue: 0.0,
    };

    for job in jobs {
        match job.status {
            JobStatus::Pending => stats.pending_jobs += 1,
            JobStatus::Assigned | JobStatus::InProgress => stats.active_jobs += 1,
            JobStatus::Completed => stats.completed_jobs += 1,
            JobStatus::Cancelled => {}
        }

        if let Some((completed_at, amount)) = completed_revenue(job) {
            stats.total_revenue += amount;
            if completed_at.is_some_and(|at| month_index(&at) == current_month) {
                stats.monthly_revenue += amount;
            }
        }
    }

    stats
}

/// Pairs each technician with the count of their active jobs
pub fn team_overview(technicians: Vec<TechnicianWithProfile>, jobs: &[Job]) -> Vec<TeamMember> {
    let mut active: HashMap<Uuid, usize> = HashMap::new();
    for job in jobs.iter().filter(|j| j.status.is_active()) {
        if let Some(tech_id) = job.assigned_to {
            *active.entry(tech_id).or_default() += 1;
        }
    }

    technicians
        .into_iter()
        .map(|technician| TeamMember {
            active_jobs: active.get(&technician.technician.id).copied().unwrap_or(0),
            technician,
        })
        .collect()
}

/// Normalizes the `months` query parameter
pub fn clamp_months(months: Option<u32>) -> u32 {
    months
        .unwrap_or(DEFAULT_CHART_MONTHS)
        .clamp(1, MAX_CHART_MONTHS)
}

/// Revenue per month for the `months` months ending with the current one,
/// oldest first
pub fn revenue_chart(jobs: &[Job], months: u32, now: DateTime<Utc>) -> Vec<RevenueBucket> {
    let current = month_index(&now);
    let first = current - i64::from(months) + 1;

    let mut buckets: Vec<RevenueBucket> = (first..=current)
        .map(|index| RevenueBucket {
            month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
            revenue: 0.0,
            jobs: 0,
        })
        .collect();

    for (completed_at, amount) in jobs.iter().filter_map(completed_revenue) {
        let Some(at) = completed_at else { continue };
        let index = month_index(&at);
        if (first..=current).contains(&index) {
            let bucket = &mut buckets[(index - first) as usize];
            bucket.revenue += amount;
            bucket.jobs += 1;
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobPriority;
    use crate::models::technician::Technician;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn job(status: JobStatus, amount: Option<f64>, completed_at: Option<DateTime<Utc>>) -> Job {
        Job {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            customer_name: "Pat".to_string(),
            customer_email: None,
            customer_phone: None,
            customer_address: None,
            title: "Fix sink".to_string(),
            description: None,
            status,
            priority: JobPriority::Normal,
            assigned_to: None,
            scheduled_at: None,
            completed_at,
            amount,
            created_at: at(2025, 1, 1),
            updated_at: at(2025, 1, 1),
        }
    }

    fn tech(status: TechnicianStatus) -> TechnicianWithProfile {
        TechnicianWithProfile {
            technician: Technician {
                id: Uuid::new_v4(),
                profile_id: Uuid::new_v4(),
                company_id: Uuid::nil(),
                skills: vec![],
                status,
                current_location: None,
                created_at: at(2025, 1, 1),
                updated_at: at(2025, 1, 1),
            },
            full_name: "Sam".to_string(),
            email: None,
        }
    }

    #[test]
    fn test_stats_counts_and_revenue() {
        let now = at(2025, 3, 15);
        let jobs = vec![
            job(JobStatus::Pending, Some(999.0), None),
            job(JobStatus::Assigned, None, None),
            job(JobStatus::InProgress, None, None),
            job(JobStatus::Completed, Some(100.0), Some(at(2025, 3, 2))),
            job(JobStatus::Completed, Some(50.5), Some(at(2025, 2, 27))),
            job(JobStatus::Completed, None, Some(at(2025, 3, 3))),
            job(JobStatus::Cancelled, Some(70.0), None),
        ];
        let techs = vec![
            tech(TechnicianStatus::Available),
            tech(TechnicianStatus::Busy),
            tech(TechnicianStatus::Available),
        ];

        let stats = dashboard_stats(&jobs, &techs, now);

        assert_eq!(stats.total_jobs, 7);
        assert_eq!(stats.pending_jobs, 1);
        assert_eq!(stats.active_jobs, 2);
        assert_eq!(stats.completed_jobs, 3);
        assert_eq!(stats.total_technicians, 3);
        assert_eq!(stats.available_technicians, 2);
        assert_eq!(stats.total_revenue, 150.5);
        assert_eq!(stats.monthly_revenue, 100.0);
    }

    #[test]
    fn test_monthly_revenue_ignores_same_month_last_year() {
        let jobs = vec![job(JobStatus::Completed, Some(10.0), Some(at(2024, 3, 10)))];
        let stats = dashboard_stats(&jobs, &[], at(2025, 3, 15));
        assert_eq!(stats.total_revenue, 10.0);
        assert_eq!(stats.monthly_revenue, 0.0);
    }

    #[test]
    fn test_team_overview_counts_active_only() {
        let techs = vec![tech(TechnicianStatus::Busy), tech(TechnicianStatus::Available)];
        let busy_id = techs[0].technician.id;

        let mut assigned = job(JobStatus::Assigned, None, None);
        assigned.assigned_to = Some(busy_id);
        let mut in_progress = job(JobStatus::InProgress, None, None);
        in_progress.assigned_to = Some(busy_id);
        let mut done = job(JobStatus::Completed, Some(1.0), Some(at(2025, 1, 2)));
        done.assigned_to = Some(busy_id);

        let team = team_overview(techs, &[assigned, in_progress, done]);
        assert_eq!(team[0].active_jobs, 2);
        assert_eq!(team[1].active_jobs, 0);

        let json = serde_json::to_value(&team[0]).unwrap();
        assert_eq!(json["active_jobs"], 2);
        assert_eq!(json["full_name"], "Sam");
    }

    #[test]
    fn test_clamp_months() {
        assert_eq!(clamp_months(None), 6);
        assert_eq!(clamp_months(Some(0)), 1);
        assert_eq!(clamp_months(Some(12)), 12);
        assert_eq!(clamp_months(Some(100)), 24);
    }

    #[test]
    fn test_revenue_chart_crosses_year_boundary() {
        let now = at(2025, 2, 10);
        let jobs = vec![
            job(JobStatus::Completed, Some(40.0), Some(at(2024, 12, 31))),
            job(JobStatus::Completed, Some(60.0), Some(at(2025, 2, 1))),
            job(JobStatus::Completed, Some(5.0), Some(at(2025, 2, 9))),
            job(JobStatus::Completed, Some(999.0), Some(at(2024, 10, 1))),
            job(JobStatus::Assigned, Some(999.0), None),
        ];

        let chart = revenue_chart(&jobs, 3, now);

        let months: Vec<_> = chart.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(months, vec!["2024-12", "2025-01", "2025-02"]);
        assert_eq!(chart[0].revenue, 40.0);
        assert_eq!(chart[0].jobs, 1);
        assert_eq!(chart[1].jobs, 0);
        assert_eq!(chart[2].revenue, 65.0);
        assert_eq!(chart[2].jobs, 2);
    }
}
