//! Command-line arguments of the EstateDesk client.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use estatedesk_domain::EntityKind;

#[derive(Parser)]
#[command(
    name = "estatedesk",
    version,
    about = "EstateDesk CRM lists from the terminal",
    long_about = "Browse, filter and act on EstateDesk leads, bookings, projects and plots.\n\n\
                  Every action is checked against the permissions of the configured role."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Use a seeded in-memory backend instead of the REST API.
    #[arg(long, global = true)]
    pub demo: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a bearer token for later commands.
    Login {
        /// Token issued by the backend.
        #[arg(long, env = "ESTATEDESK_TOKEN")]
        token: String,
    },

    /// Remove the stored bearer token.
    Logout,

    /// Show the capabilities of the configured role per page.
    Permissions,

    /// Fetch one page of an entity list.
    List(ListArgs),

    /// Delete the given rows of the loaded page.
    BulkDelete {
        #[command(flatten)]
        list: ListArgs,

        /// Row ids to delete.
        #[arg(long = "id", value_name = "ID", required = true)]
        ids: Vec<String>,
    },

    /// Assign the given rows of the loaded page to a user.
    BulkAssign {
        #[command(flatten)]
        list: ListArgs,

        /// Row ids to assign.
        #[arg(long = "id", value_name = "ID", required = true)]
        ids: Vec<String>,

        /// User the rows are assigned to.
        #[arg(long)]
        assignee: String,
    },

    /// Write the loaded page (or the given rows) as CSV.
    Export {
        #[command(flatten)]
        list: ListArgs,

        /// Row ids to export; all loaded rows when omitted.
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,

        /// Columns to write, in order.
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Output file; standard output when omitted.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Approve, reject, create or edit bookings.
    #[command(subcommand)]
    Booking(BookingCommand),
}

#[derive(Subcommand)]
pub enum BookingCommand {
    /// Approve a pending booking (Admin only).
    Approve(BookingTarget),

    /// Reject a pending booking (Admin only).
    Reject(BookingTarget),

    /// Create a booking.
    Create(BookingForm),

    /// Edit a booking that is not yet decided.
    Edit {
        #[command(flatten)]
        target: BookingTarget,

        #[command(flatten)]
        form: BookingForm,
    },
}

#[derive(Args)]
pub struct BookingTarget {
    /// Booking id.
    pub id: String,

    /// Page of the booking list holding the booking.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Page size of the booking list.
    #[arg(long = "page-size", default_value_t = 10)]
    pub page_size: u32,
}

#[derive(Args)]
pub struct BookingForm {
    /// Customer name.
    #[arg(long = "customer-name")]
    pub customer_name: String,

    /// Customer phone number.
    #[arg(long = "customer-phone", default_value = "")]
    pub customer_phone: String,

    /// Booked plot id.
    #[arg(long = "plot-id")]
    pub plot_id: Option<String>,

    /// Amount paid at booking.
    #[arg(long = "booking-amount")]
    pub booking_amount: f64,

    /// Total price of the plot.
    #[arg(long = "total-amount")]
    pub total_plot_amount: f64,

    /// Free-form remarks.
    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Entity list to load.
    #[arg(value_enum)]
    pub entity: EntityArg,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (5, 10, 15, 25, 50 or 100).
    #[arg(long = "page-size", default_value_t = 10)]
    pub page_size: u32,

    /// Free-text search.
    #[arg(long)]
    pub search: Option<String>,

    /// Column filter as KEY=VALUE; comma-separated values select several options.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// First day of the created-at range (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the created-at range (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,

    /// Sort loaded rows by this column.
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Columns to print; every column of the first row when omitted.
    #[arg(long = "show", value_delimiter = ',')]
    pub show: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EntityArg {
    Leads,
    Bookings,
    Projects,
    Plots,
}

impl From<EntityArg> for EntityKind {
    fn from(value: EntityArg) -> Self {
        match value {
            EntityArg::Leads => Self::Leads,
            EntityArg::Bookings => Self::Bookings,
            EntityArg::Projects => Self::ProjectStatus,
            EntityArg::Plots => Self::Plots,
        }
    }
}
