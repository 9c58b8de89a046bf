//! Domain models and rules of the EstateDesk list-management core.

#![forbid(unsafe_code)]

mod booking;
mod entity;
mod filter;
mod list_query;
mod security;
mod selection;

pub use booking::{
    Booking, BookingAction, BookingDraft, BookingStatus, BookingSubmission, BookingTransition,
    FormErrors, TOTAL_BELOW_BOOKING_MESSAGE, booking_actions,
};
pub use entity::{EntityKind, ListRecord, Pagination, RecordPage};
pub use filter::{DateRange, FilterDescriptor, FilterKind, FilterPanel, FilterSet, FilterValue};
pub use list_query::{
    ListQueryState, PAGE_SIZES, PageSize, QueryParams, SortDirection, SortSpec,
};
pub use security::{
    Capability, CapabilityIds, PAGE_FALLBACKS, PageFallback, PageGrants, PageName,
    PermissionCatalog, PermissionDefinition, PermissionGrant, PermissionSnapshot, has_permission,
};
pub use selection::SelectionSet;
