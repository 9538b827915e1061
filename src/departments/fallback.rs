//! Substitute departments served when a lookup is rejected or fails.

use crate::departments::types::DepartmentDto;
use crate::resilience::{CallRequest, FailureReason, FallbackProvider};

/// Maps each failure reason to a fixed, recognisable department.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepartmentFallback;

impl FallbackProvider<DepartmentDto> for DepartmentFallback {
    fn fallback(&self, request: &CallRequest, reason: FailureReason) -> DepartmentDto {
        let (name, address, code) = match reason {
            FailureReason::RejectedByLimiter => ("Rate Limited Dept", "Rate Limited Address", "999"),
            FailureReason::BreakerOpen => ("Default Department", "Fallback Address", "123"),
            FailureReason::DownstreamError => {
                ("Unavailable Department", "Unavailable Address", "502")
            }
            FailureReason::Timeout => ("Delayed Department", "Delayed Address", "504"),
        };

        DepartmentDto {
            id: request.key.parse().unwrap_or_default(),
            department_name: name.to_string(),
            department_address: address.to_string(),
            department_code: code.to_string(),
        }
    }
}
