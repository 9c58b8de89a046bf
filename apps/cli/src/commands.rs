use std::fs::File;
use std::io;

use estatedesk_application::{ListController, ListSnapshot, Notice};
use estatedesk_core::{AppError, AppResult, AuthToken, RecordId, UserRole};
use estatedesk_domain::{
    Booking, BookingDraft, BookingTransition, Capability, DateRange, EntityKind, FilterSet,
    FilterValue, ListQueryState, PageSize, SortDirection, SortSpec,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{BookingCommand, BookingForm, BookingTarget, Command, ListArgs};
use crate::cli_services::CliServices;

const LISTED_ENTITIES: [EntityKind; 4] = [
    EntityKind::Leads,
    EntityKind::Bookings,
    EntityKind::ProjectStatus,
    EntityKind::Plots,
];

pub async fn run(services: &CliServices, command: Command) -> AppResult<()> {
    match command {
        Command::Login { token } => {
            let token = AuthToken::new(token)
                .ok_or_else(|| AppError::Validation("token must not be empty".to_owned()))?;
            services.token_file.save_token(&token).await?;
            info!("token stored");
            Ok(())
        }
        Command::Logout => {
            services.permissions.invalidate().await;
            services.token_file.clear_token().await?;
            info!("token removed");
            Ok(())
        }
        Command::Permissions => show_permissions(services).await,
        Command::List(args) => {
            services.permissions.load(&services.user).await?;
            let list = load_list(services, &args).await?;
            let snapshot = list.snapshot().await;
            print_rows(&snapshot, &args.show);
            if snapshot.entity == EntityKind::Bookings {
                print_booking_actions(&snapshot, services.user.role());
            }
            Ok(())
        }
        Command::BulkDelete { list: args, ids } => {
            services.permissions.load(&services.user).await?;
            let list = load_list(services, &args).await?;
            select_rows(services, &list, &ids).await?;
            services.bulk_actions.bulk_delete(&list).await?;
            print_rows(&list.snapshot().await, &args.show);
            Ok(())
        }
        Command::BulkAssign {
            list: args,
            ids,
            assignee,
        } => {
            services.permissions.load(&services.user).await?;
            let list = load_list(services, &args).await?;
            select_rows(services, &list, &ids).await?;
            services
                .bulk_actions
                .bulk_assign(&list, &RecordId::from(assignee.as_str()))
                .await?;
            print_rows(&list.snapshot().await, &args.show);
            Ok(())
        }
        Command::Export {
            list: args,
            ids,
            columns,
            output,
        } => {
            services.permissions.load(&services.user).await?;
            let list = load_list(services, &args).await?;
            select_rows(services, &list, &ids).await?;
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();

            let exported = match output {
                Some(path) => {
                    let file = File::create(&path).map_err(|error| {
                        AppError::Internal(format!(
                            "failed to create '{}': {error}",
                            path.display()
                        ))
                    })?;
                    services.bulk_actions.export_csv(&list, &columns, file).await?
                }
                None => {
                    services
                        .bulk_actions
                        .export_csv(&list, &columns, io::stdout())
                        .await?
                }
            };
            services
                .notifier
                .notify(Notice::Success(format!("{exported} rows exported")));
            Ok(())
        }
        Command::Booking(command) => run_booking(services, command).await,
    }
}

async fn run_booking(services: &CliServices, command: BookingCommand) -> AppResult<()> {
    services.permissions.load(&services.user).await?;

    match command {
        BookingCommand::Approve(target) => {
            decide_booking(services, &target, BookingTransition::Approve).await
        }
        BookingCommand::Reject(target) => {
            decide_booking(services, &target, BookingTransition::Reject).await
        }
        BookingCommand::Create(form) => {
            let list = booking_list(services, 1, PageSize::default().get()).await?;
            services
                .bookings
                .submit(&list, None, &booking_draft(form))
                .await
        }
        BookingCommand::Edit { target, form } => {
            let list = booking_list(services, target.page, target.page_size).await?;
            let id = RecordId::from(target.id.as_str());
            let record = list.find_loaded(&id).await.ok_or_else(|| {
                AppError::NotFound(format!(
                    "booking '{id}' is not on page {} of the booking list",
                    target.page
                ))
            })?;
            let existing = Booking::from_record(&record)?;
            services
                .bookings
                .submit(&list, Some(&existing), &booking_draft(form))
                .await
        }
    }
}

async fn decide_booking(
    services: &CliServices,
    target: &BookingTarget,
    transition: BookingTransition,
) -> AppResult<()> {
    let list = booking_list(services, target.page, target.page_size).await?;
    services
        .bookings
        .transition(
            &services.user,
            &list,
            &RecordId::from(target.id.as_str()),
            transition,
        )
        .await?;

    if let Some(record) = list.find_loaded(&RecordId::from(target.id.as_str())).await {
        let booking = Booking::from_record(&record)?;
        println!(
            "booking {} is now {} (by {})",
            booking.id,
            booking.status,
            booking.approved_by_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn booking_draft(form: BookingForm) -> BookingDraft {
    BookingDraft {
        customer_name: form.customer_name,
        customer_phone: form.customer_phone,
        plot_id: form.plot_id.as_deref().map(RecordId::from),
        booking_amount: form.booking_amount,
        total_plot_amount: form.total_plot_amount,
        remarks: form.remarks,
    }
}

async fn booking_list(
    services: &CliServices,
    page: u32,
    page_size: u32,
) -> AppResult<ListController> {
    let mut query = ListQueryState::new(PageSize::new(page_size)?);
    query.set_page(page);
    let list = ListController::with_query(
        EntityKind::Bookings,
        query,
        services.backend.clone(),
        services.tokens.clone(),
        services.notifier.clone(),
    );
    list.refresh().await?;
    Ok(list)
}

async fn load_list(services: &CliServices, args: &ListArgs) -> AppResult<ListController> {
    let entity = EntityKind::from(args.entity);
    let query = list_query(args)?;
    let list = ListController::with_query(
        entity,
        query,
        services.backend.clone(),
        services.tokens.clone(),
        services.notifier.clone(),
    );
    list.refresh().await?;
    Ok(list)
}

/// Builds the query state described by list arguments.
fn list_query(args: &ListArgs) -> AppResult<ListQueryState> {
    let mut query = ListQueryState::new(PageSize::new(args.page_size)?);

    if let Some(search) = &args.search {
        query.set_search(search.as_str());
    }

    let mut filters = FilterSet::new();
    for filter in &args.filters {
        let (key, value) = parse_filter(filter)?;
        filters.set(key, value);
    }
    query.replace_filters(filters);

    if args.from.is_some() || args.to.is_some() {
        let range = DateRange::parse(
            args.from.as_deref().unwrap_or_default(),
            args.to.as_deref().unwrap_or_default(),
        )?;
        query.set_date_range(Some(range));
    }

    if let Some(key) = &args.sort {
        let direction = if args.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        query.set_sort(Some(SortSpec::new(key.as_str(), direction)));
    }

    query.set_page(args.page);
    Ok(query)
}

fn parse_filter(raw: &str) -> AppResult<(String, FilterValue)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        AppError::Validation(format!("filter '{raw}' must look like KEY=VALUE"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation(format!("filter '{raw}' has no key")));
    }

    let value = if value.contains(',') {
        FilterValue::Many(value.split(',').map(|part| part.trim().to_owned()).collect())
    } else {
        FilterValue::Text(value.trim().to_owned())
    };
    Ok((key.to_owned(), value))
}

async fn select_rows(
    services: &CliServices,
    list: &ListController,
    ids: &[String],
) -> AppResult<()> {
    for raw in ids {
        let id = RecordId::from(raw.as_str());
        if list.find_loaded(&id).await.is_none() {
            let message = format!("row '{id}' is not on the loaded page");
            services.notifier.notify(Notice::Error(message.clone()));
            return Err(AppError::Validation(message));
        }
        list.toggle_selection(id).await;
    }
    Ok(())
}

async fn show_permissions(services: &CliServices) -> AppResult<()> {
    let snapshot = services.permissions.load(&services.user).await?;

    let header = Capability::all()
        .iter()
        .map(Capability::catalog_name)
        .collect::<Vec<_>>()
        .join("\t");
    println!("page\t{header}");

    for entity in LISTED_ENTITIES {
        let page = entity.page();
        let cells = Capability::all()
            .iter()
            .map(|capability| if snapshot.can(page, *capability) { "yes" } else { "no" })
            .collect::<Vec<_>>()
            .join("\t");
        println!("{}\t{cells}", page.as_str());
    }

    Ok(())
}

fn print_rows(snapshot: &ListSnapshot, show: &[String]) {
    let columns: Vec<String> = if show.is_empty() {
        snapshot
            .rows
            .first()
            .and_then(|row| row.data().as_object())
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default()
    } else {
        show.to_vec()
    };

    println!("{}", columns.join("\t"));
    for row in &snapshot.rows {
        let cells = columns
            .iter()
            .map(|column| cell_text(row.field(column)))
            .collect::<Vec<_>>()
            .join("\t");
        println!("{cells}");
    }
    println!(
        "page {} of {} ({} rows, {} selected)",
        snapshot.pagination.page,
        snapshot.pagination.total_pages.max(1),
        snapshot.pagination.total,
        snapshot.selected_ids.len()
    );
}

fn print_booking_actions(snapshot: &ListSnapshot, role: &UserRole) {
    for row in &snapshot.rows {
        match Booking::from_record(row) {
            Ok(booking) => {
                let actions = booking
                    .actions_for(role)
                    .iter()
                    .map(|action| format!("{action:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("booking {} [{}]: {actions}", booking.id, booking.status);
            }
            Err(error) => warn!(booking_id = %row.id(), error = %error, "unreadable booking row"),
        }
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use estatedesk_domain::FilterValue;

    use super::{list_query, parse_filter};
    use crate::cli::{EntityArg, ListArgs};

    fn args() -> ListArgs {
        ListArgs {
            entity: EntityArg::Bookings,
            page: 3,
            page_size: 25,
            search: Some("asha".to_owned()),
            filters: vec!["status=pending".to_owned()],
            from: Some("2026-09-01".to_owned()),
            to: None,
            sort: Some("bookingAmount".to_owned()),
            desc: true,
            show: Vec::new(),
        }
    }

    #[test]
    fn list_arguments_build_one_query() {
        let query = list_query(&args()).unwrap_or_else(|_| unreachable!());
        let params = query.query_params();

        assert_eq!(params.get("page"), Some("3"));
        assert_eq!(params.get("limit"), Some("25"));
        assert_eq!(params.get("search"), Some("asha"));
        assert_eq!(params.get("status"), Some("pending"));
        assert_eq!(params.get("fromDate"), Some("2026-09-01"));
        assert_eq!(params.get("toDate"), None);
        assert!(params.get("sort").is_none());
        assert!(query.sort().is_some());
    }

    #[test]
    fn invalid_list_arguments_are_rejected() {
        let mut bad_size = args();
        bad_size.page_size = 7;
        assert!(list_query(&bad_size).is_err());

        let mut bad_range = args();
        bad_range.to = Some("2026-08-01".to_owned());
        assert!(list_query(&bad_range).is_err());
    }

    #[test]
    fn filters_parse_single_and_multi_values() {
        assert!(matches!(
            parse_filter("status=pending"),
            Ok((ref key, FilterValue::Text(ref value))) if key == "status" && value == "pending"
        ));
        assert!(matches!(
            parse_filter("projectName=Green Acres, Blue Hills"),
            Ok((_, FilterValue::Many(ref values))) if values.len() == 2 && values[1] == "Blue Hills"
        ));
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=pending").is_err());
    }
}
