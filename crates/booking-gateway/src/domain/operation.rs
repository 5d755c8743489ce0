//! Booking operations and their contracts.
//!
//! Every operation carries a static description: the name the remote service
//! listens for, the exact parameter set it accepts, whether it writes, and how
//! its response is turned into an outward result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operations served by the remote booking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    GetAllScheduleSlots,
    AvailableScheduleSlots,
    UserScheduleSlots,
    AllScheduleSlots,
    BookedScheduleSlots,
    BookScheduleSlot,
}

/// How a response envelope becomes an outward result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMapping {
    /// Payload is returned verbatim
    PassThrough,
    /// Absent or empty payload means the caller has nothing on record
    RequireNonEmpty,
    /// Inner result field of the payload
    UnwrapResult,
    /// Embedded 404 becomes not-found, anything else unwraps
    NotFoundOrUnwrap,
    /// Embedded 400 becomes a domain rejection, anything else unwraps
    DomainErrorOrUnwrap,
}

/// Static contract of one operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationInfo {
    pub operation: Operation,
    /// Value of the `operation` attribute on the outbound message
    pub wire_name: &'static str,
    /// Exact parameter set, in the order reported when missing
    pub required_params: &'static [&'static str],
    pub is_write: bool,
    pub mapping: ResponseMapping,
}

impl OperationInfo {
    const fn read(
        operation: Operation,
        wire_name: &'static str,
        required_params: &'static [&'static str],
        mapping: ResponseMapping,
    ) -> Self {
        Self {
            operation,
            wire_name,
            required_params,
            is_write: false,
            mapping,
        }
    }

    const fn write(
        operation: Operation,
        wire_name: &'static str,
        required_params: &'static [&'static str],
        mapping: ResponseMapping,
    ) -> Self {
        Self {
            operation,
            wire_name,
            required_params,
            is_write: true,
            mapping,
        }
    }

    /// Operation takes no parameters at all
    pub const fn is_parameterless(&self) -> bool {
        self.required_params.is_empty()
    }
}

const GET_ALL_SCHEDULE_SLOTS: OperationInfo = OperationInfo::read(
    Operation::GetAllScheduleSlots,
    "getAllScheduleLots",
    &[],
    ResponseMapping::PassThrough,
);

// Same backend query as GetAllScheduleSlots
const AVAILABLE_SCHEDULE_SLOTS: OperationInfo = OperationInfo::read(
    Operation::AvailableScheduleSlots,
    "getAllScheduleLots",
    &[],
    ResponseMapping::PassThrough,
);

const USER_SCHEDULE_SLOTS: OperationInfo = OperationInfo::read(
    Operation::UserScheduleSlots,
    "userSchedulesLots",
    &["userId"],
    ResponseMapping::RequireNonEmpty,
);

const ALL_SCHEDULE_SLOTS: OperationInfo = OperationInfo::read(
    Operation::AllScheduleSlots,
    "allScheduleSlots",
    &[],
    ResponseMapping::UnwrapResult,
);

const BOOKED_SCHEDULE_SLOTS: OperationInfo = OperationInfo::read(
    Operation::BookedScheduleSlots,
    "bookedScheduleSlots",
    &[],
    ResponseMapping::NotFoundOrUnwrap,
);

const BOOK_SCHEDULE_SLOT: OperationInfo = OperationInfo::write(
    Operation::BookScheduleSlot,
    "bookScheduleSlot",
    &["userId", "scheduleSlotId", "peopleQuantity"],
    ResponseMapping::DomainErrorOrUnwrap,
);

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 6] = [
        Operation::GetAllScheduleSlots,
        Operation::AvailableScheduleSlots,
        Operation::UserScheduleSlots,
        Operation::AllScheduleSlots,
        Operation::BookedScheduleSlots,
        Operation::BookScheduleSlot,
    ];

    /// Contract for this operation.
    pub const fn info(&self) -> &'static OperationInfo {
        match self {
            Operation::GetAllScheduleSlots => &GET_ALL_SCHEDULE_SLOTS,
            Operation::AvailableScheduleSlots => &AVAILABLE_SCHEDULE_SLOTS,
            Operation::UserScheduleSlots => &USER_SCHEDULE_SLOTS,
            Operation::AllScheduleSlots => &ALL_SCHEDULE_SLOTS,
            Operation::BookedScheduleSlots => &BOOKED_SCHEDULE_SLOTS,
            Operation::BookScheduleSlot => &BOOK_SCHEDULE_SLOT,
        }
    }

    pub const fn wire_name(&self) -> &'static str {
        self.info().wire_name
    }

    pub const fn required_params(&self) -> &'static [&'static str] {
        self.info().required_params
    }

    pub const fn is_write(&self) -> bool {
        self.info().is_write
    }

    pub const fn mapping(&self) -> ResponseMapping {
        self.info().mapping
    }

    /// Name used in logs and metric labels
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::GetAllScheduleSlots => "getAllScheduleSlots",
            Operation::AvailableScheduleSlots => "availableScheduleSlots",
            Operation::UserScheduleSlots => "userScheduleSlots",
            Operation::AllScheduleSlots => "allScheduleSlots",
            Operation::BookedScheduleSlots => "bookedScheduleSlots",
            Operation::BookScheduleSlot => "bookScheduleSlot",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown operation name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation: {}", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
