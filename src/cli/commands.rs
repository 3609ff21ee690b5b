use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::cli::output::{self, render_table};
use crate::cli::{CliContext, CliError};
use crate::config::{ConfigManager, EngineConfig};
use crate::core::services::{BookingAction, BookingSeed, ProcessorOutcome, ResponseStatus};
use crate::core::{ActionResponse, BookingEngine, SystemClock};
use crate::domain::{
    Catalog, ConsentOrigin, CustomerContact, Displayable, GiftCardProgram, PolicyConsent, Service,
    StaffMember,
};
use crate::money::{format_cents, Cents, CurrencyCode, FeePolicy};
use crate::storage::{JsonStorage, StorageBackend, Workspace};

const DEFAULT_SLUG: &str = "demo-studio";
const DEFAULT_CONSENT: &str = "cli-accepted";

pub fn dispatch(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let Some((command, rest)) = args.split_first() else {
        print_help();
        return Ok(());
    };
    match command.as_str() {
        "init" => init(ctx, rest),
        "book" => book(ctx, rest),
        "action" => action(ctx, rest),
        "clear-gate" => clear_gate(ctx, rest),
        "processor" => processor(ctx, rest),
        "list" => list(ctx),
        "analytics" => analytics(ctx),
        "customers" => customers(ctx),
        "gift-issue" => gift_issue(ctx, rest),
        "gift-adjust" => gift_adjust(ctx, rest),
        "gift-balance" => gift_balance(ctx, rest),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => Err(CliError::Input(format!(
            "unknown command `{other}`; try `help`"
        ))),
    }
}

fn print_help() {
    output::section("booking_core_cli");
    for line in [
        "init [slug]                              create config and a demo workspace",
        "book <service> <start> <name> <contact>  [--staff ID] [--gift CODE:CENTS]",
        "                                         [--requires-action] [--notes TEXT]",
        "action <code> <complete|no-show|cancel|refund>",
        "clear-gate <code>                        customer finished the payment step",
        "processor <code> <expired|disputed>      record a processor outcome",
        "list                                     committed bookings",
        "analytics                                revenue, fees, utilization",
        "customers                                distinct customers",
        "gift-issue <code> <cents> [note]",
        "gift-adjust <code> <delta-cents> [note]",
        "gift-balance <code>",
    ] {
        println!("  {line}");
    }
}

/// One loaded workspace plus the engine rebuilt from it.
struct Session {
    storage: JsonStorage,
    catalog: Catalog,
    engine: BookingEngine,
    workspace: String,
}

impl Session {
    fn open(ctx: &CliContext) -> Result<Self, CliError> {
        let storage = JsonStorage::new(Some(ctx.base_dir.clone()), None)?;
        if !storage.exists(&ctx.workspace) {
            return Err(CliError::Command(format!(
                "workspace `{}` is not initialized; run `init` first",
                ctx.workspace
            )));
        }
        let config = ConfigManager::with_base_dir(ctx.base_dir.clone())?.load()?;
        let (catalog, snapshot) = storage.load(&ctx.workspace)?.into_parts();
        let engine = BookingEngine::with_catalog(config, catalog.clone(), Arc::new(SystemClock))?
            .restore(snapshot);
        Ok(Self {
            storage,
            catalog,
            engine,
            workspace: ctx.workspace.clone(),
        })
    }

    fn save(&self) -> Result<(), CliError> {
        let workspace = Workspace::from_snapshot(self.catalog.clone(), self.engine.snapshot());
        self.storage.save(&workspace, &self.workspace)?;
        Ok(())
    }

    fn currency(&self) -> &CurrencyCode {
        &self.engine.config().currency
    }
}

fn init(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let manager = ConfigManager::with_base_dir(ctx.base_dir.clone())?;
    let mut config = if manager.path().exists() {
        manager.load()?
    } else {
        demo_config()
    };
    if let Some(slug) = args.first() {
        config.business_slug = slug.clone();
    }
    manager.save(&config)?;

    let storage = JsonStorage::new(Some(ctx.base_dir.clone()), None)?;
    if storage.exists(&ctx.workspace) {
        output::info(format!("Workspace `{}` already exists.", ctx.workspace));
    } else {
        storage.save(&Workspace::new(demo_catalog()), &ctx.workspace)?;
        output::success(format!("Created workspace `{}`.", ctx.workspace));
    }
    output::success(format!(
        "Configured `{}` in {}.",
        config.business_slug,
        ctx.base_dir.display()
    ));
    Ok(())
}

fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::new(DEFAULT_SLUG);
    config.policies.no_show = FeePolicy::percent(50.0);
    config.policies.cancellation = FeePolicy::flat(25.0);
    config.gift_cards = GiftCardProgram {
        enabled: true,
        ..GiftCardProgram::default()
    };
    config
}

fn demo_catalog() -> Catalog {
    Catalog::new(
        vec![
            Service::new("cut", "Haircut", "Hair", 60, 6_500),
            Service::new("color", "Color", "Hair", 120, 14_000),
            Service::new("consult", "Consultation", "General", 30, 0),
        ],
        vec![
            StaffMember::new("sam", "Sam Rivera", "#336699"),
            StaffMember::new("ria", "Ria Chen", "#993366"),
        ],
    )
}

fn book(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let parsed = BookArgs::parse(args)?;
    let session = Session::open(ctx)?;

    let now = Utc::now();
    let consent = PolicyConsent::new(parsed.consent.clone(), now).with_origin(ConsentOrigin {
        source: "cli".into(),
        ..ConsentOrigin::default()
    });
    let mut seed = BookingSeed::new(parsed.service, parsed.starts_at, parsed.contact, consent);
    if let Some(staff) = parsed.staff {
        seed = seed.with_staff(staff);
    }
    if let Some((code, cents)) = parsed.gift_card {
        seed = seed.with_gift_card(code, cents);
    }
    if parsed.requires_action {
        seed = seed.requiring_action();
    }
    seed.notes = parsed.notes;

    let booking = session.engine.create_booking(seed)?;
    session.save()?;
    output::success(format!(
        "Booked {} for {} ({}), authorized {}.",
        booking.code,
        booking.customer.name,
        booking.status,
        format_cents(booking.financials.chargeable_cents(), session.currency())
    ));
    Ok(())
}

#[derive(Debug)]
struct BookArgs {
    service: String,
    starts_at: DateTime<Utc>,
    contact: CustomerContact,
    staff: Option<String>,
    gift_card: Option<(String, Cents)>,
    requires_action: bool,
    notes: Option<String>,
    consent: String,
}

impl BookArgs {
    fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut positional = Vec::new();
        let mut staff = None;
        let mut gift_card = None;
        let mut requires_action = false;
        let mut notes = None;
        let mut consent = DEFAULT_CONSENT.to_string();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--staff" => staff = Some(flag_value(&mut iter, "--staff")?),
                "--gift" => {
                    let raw = flag_value(&mut iter, "--gift")?;
                    let (code, cents) = raw.split_once(':').ok_or_else(|| {
                        CliError::Input(format!("--gift expects CODE:CENTS, got `{raw}`"))
                    })?;
                    gift_card = Some((code.to_string(), parse_cents(cents)?));
                }
                "--requires-action" => requires_action = true,
                "--notes" => notes = Some(flag_value(&mut iter, "--notes")?),
                "--consent" => consent = flag_value(&mut iter, "--consent")?,
                other if other.starts_with("--") => {
                    return Err(CliError::Input(format!("unknown flag `{other}`")))
                }
                _ => positional.push(arg.clone()),
            }
        }

        let [service, start, name, contact] = positional.as_slice() else {
            return Err(CliError::Input(
                "usage: book <service> <start> <name> <email|phone> [flags]".into(),
            ));
        };
        let contact = if contact.contains('@') {
            CustomerContact::new(name.clone()).with_email(contact.clone())
        } else {
            CustomerContact::new(name.clone()).with_phone(contact.clone())
        };
        Ok(Self {
            service: service.clone(),
            starts_at: parse_start(start)?,
            contact,
            staff,
            gift_card,
            requires_action,
            notes,
            consent,
        })
    }
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<String, CliError> {
    iter.next()
        .cloned()
        .ok_or_else(|| CliError::Input(format!("{flag} needs a value")))
}

/// RFC 3339, or `YYYY-MM-DD HH:MM` / `YYYY-MM-DDTHH:MM` read as UTC.
fn parse_start(raw: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(|| CliError::Input(format!("cannot read `{raw}` as a start time")))
}

fn parse_cents(raw: &str) -> Result<Cents, CliError> {
    raw.trim()
        .parse::<Cents>()
        .map_err(|_| CliError::Input(format!("`{raw}` is not a whole number of cents")))
}

fn expect_args<'a, const N: usize>(
    args: &'a [String],
    usage: &str,
) -> Result<&'a [String; N], CliError> {
    args.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| CliError::Input(format!("usage: {usage}")))
}

fn action(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code, raw_action] = expect_args::<2>(args, "action <code> <action>")?;
    let action = BookingAction::from_str(raw_action)?;
    let session = Session::open(ctx)?;
    let response = session.engine.apply_action_by_code(code, action)?;
    report(&session, &response)
}

fn clear_gate(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code] = expect_args::<1>(args, "clear-gate <code>")?;
    let session = Session::open(ctx)?;
    let booking = session.engine.booking_by_code(code)?;
    let response = session.engine.clear_action_gate(booking.id)?;
    report(&session, &response)
}

fn processor(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code, raw] = expect_args::<2>(args, "processor <code> <expired|disputed>")?;
    let outcome = match raw.trim().to_ascii_lowercase().as_str() {
        "expired" => ProcessorOutcome::Expired,
        "disputed" => ProcessorOutcome::Disputed,
        other => {
            return Err(CliError::Input(format!(
                "unknown processor outcome `{other}`"
            )))
        }
    };
    let session = Session::open(ctx)?;
    let booking = session.engine.booking_by_code(code)?;
    let response = session.engine.record_processor_outcome(booking.id, outcome)?;
    report(&session, &response)
}

fn report(session: &Session, response: &ActionResponse) -> Result<(), CliError> {
    if response.committed {
        session.save()?;
    }
    let booking = &response.booking;
    match response.status {
        ResponseStatus::RequiresAction => {
            output::warning(format!("{} {}", booking.code, response.message));
            if let Some(url) = response.pay_link_url.as_deref() {
                output::info(format!("Pay link: {url}"));
            }
        }
        ResponseStatus::Success if response.committed => output::success(format!(
            "{} is now {}. {} Net payout {}.",
            booking.code,
            booking.status,
            response.message,
            format_cents(booking.financials.net_payout_cents, session.currency())
        )),
        ResponseStatus::Success => {
            output::info(format!("{} {}", booking.display_label(), response.message))
        }
    }
    Ok(())
}

fn list(ctx: &CliContext) -> Result<(), CliError> {
    let session = Session::open(ctx)?;
    let bookings = session.engine.bookings();
    if bookings.is_empty() {
        output::info("No bookings yet.");
        return Ok(());
    }
    let currency = session.currency();
    let rows: Vec<Vec<String>> = bookings
        .iter()
        .map(|booking| {
            vec![
                booking.code.clone(),
                booking.status.to_string(),
                booking.service.name.clone(),
                booking.customer.name.clone(),
                booking.starts_at.format("%Y-%m-%d %H:%M").to_string(),
                format_cents(booking.financials.chargeable_cents(), currency),
                format_cents(booking.financials.net_payout_cents, currency),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["Code", "Status", "Service", "Customer", "Starts", "Charge", "Net"],
            &rows
        )
    );
    Ok(())
}

fn analytics(ctx: &CliContext) -> Result<(), CliError> {
    let session = Session::open(ctx)?;
    let snapshot = session.engine.analytics();
    let currency = session.currency();

    output::section("Revenue by month");
    let rows: Vec<Vec<String>> = snapshot
        .revenue_by_month
        .iter()
        .map(|entry| vec![entry.month.clone(), format_cents(entry.revenue_cents, currency)])
        .collect();
    println!("{}", render_table(&["Month", "Revenue"], &rows));

    output::section("Status");
    let rows: Vec<Vec<String>> = snapshot
        .status_counts
        .iter()
        .map(|(status, count)| vec![status.to_string(), count.to_string()])
        .collect();
    println!("{}", render_table(&["Status", "Bookings"], &rows));

    output::section("Staff utilization");
    let rows: Vec<Vec<String>> = snapshot
        .staff_utilization
        .iter()
        .map(|entry| {
            vec![
                entry.staff_name.clone(),
                entry.total_minutes.to_string(),
                format!("{}%", entry.utilization_percent),
            ]
        })
        .collect();
    println!("{}", render_table(&["Staff", "Minutes", "Utilization"], &rows));

    output::section("Fees");
    let fees = &snapshot.fees;
    for (label, cents) in [
        ("Captured", fees.captured_cents),
        ("Refunded", fees.refunded_cents),
        ("Platform fee", fees.platform_fee_cents),
        ("Processor fee", fees.processor_fee_cents),
        ("Net payout", fees.net_payout_cents),
    ] {
        println!("{label:<14}{}", format_cents(cents, currency));
    }
    println!("{:<14}{}%", "No-show rate", snapshot.no_show_rate_percent);
    println!("{:<14}{}", "Bookings", snapshot.total_bookings);
    Ok(())
}

fn customers(ctx: &CliContext) -> Result<(), CliError> {
    let session = Session::open(ctx)?;
    let rows: Vec<Vec<String>> = session
        .engine
        .customers()
        .into_iter()
        .map(|customer| {
            vec![
                customer.name,
                customer.email.unwrap_or_default(),
                customer.phone.unwrap_or_default(),
            ]
        })
        .collect();
    if rows.is_empty() {
        output::info("No customers yet.");
        return Ok(());
    }
    println!("{}", render_table(&["Name", "Email", "Phone"], &rows));
    Ok(())
}

fn gift_issue(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code, amount] = expect_args::<2>(args, "gift-issue <code> <cents> [note]")?;
    let cents = parse_cents(amount)?;
    let session = Session::open(ctx)?;
    let entry = session
        .engine
        .issue_gift_card(code, cents, args.get(2).map(String::as_str))?;
    session.save()?;
    output::success(format!(
        "Issued {} on {}; balance {}.",
        format_cents(entry.delta_cents, session.currency()),
        entry.code,
        format_cents(entry.balance_after_cents, session.currency())
    ));
    Ok(())
}

fn gift_adjust(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code, delta] = expect_args::<2>(args, "gift-adjust <code> <delta-cents> [note]")?;
    let cents = parse_cents(delta)?;
    let session = Session::open(ctx)?;
    let entry = session
        .engine
        .adjust_gift_card(code, cents, args.get(2).map(String::as_str))?;
    session.save()?;
    output::success(format!(
        "Adjusted {} by {}; balance {}.",
        entry.code,
        format_cents(entry.delta_cents, session.currency()),
        format_cents(entry.balance_after_cents, session.currency())
    ));
    Ok(())
}

fn gift_balance(ctx: &CliContext, args: &[String]) -> Result<(), CliError> {
    let [code] = expect_args::<1>(args, "gift-balance <code>")?;
    let session = Session::open(ctx)?;
    let currency = session.currency();
    let history = session.engine.gift_card_history(code);
    if history.is_empty() {
        output::warning(format!("No ledger entries for {}.", code.trim().to_uppercase()));
        return Ok(());
    }
    println!(
        "Balance {}",
        format_cents(session.engine.gift_card_balance(code), currency)
    );
    let rows: Vec<Vec<String>> = history
        .iter()
        .map(|entry| {
            vec![
                entry.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                entry.reason.to_string(),
                format_cents(entry.delta_cents, currency),
                format_cents(entry.balance_after_cents, currency),
                entry.booking_code.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["When", "Reason", "Delta", "Balance", "Booking"], &rows)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn book_args_read_flags_and_contact_kind() {
        let parsed = BookArgs::parse(&strings(&[
            "cut",
            "2026-05-10 09:30",
            "Ada",
            "555-0100",
            "--staff",
            "sam",
            "--gift",
            "GC-1:2500",
            "--requires-action",
        ]))
        .unwrap();
        assert_eq!(parsed.service, "cut");
        assert_eq!(parsed.starts_at.to_rfc3339(), "2026-05-10T09:30:00+00:00");
        assert_eq!(parsed.contact.phone.as_deref(), Some("555-0100"));
        assert!(parsed.contact.email.is_none());
        assert_eq!(parsed.staff.as_deref(), Some("sam"));
        assert_eq!(parsed.gift_card, Some(("GC-1".to_string(), 2_500)));
        assert!(parsed.requires_action);
    }

    #[test]
    fn book_args_reject_missing_positionals() {
        let err = BookArgs::parse(&strings(&["cut", "2026-05-10 09:30"])).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }

    #[test]
    fn malformed_gift_flag_is_input_error() {
        let err = BookArgs::parse(&strings(&[
            "cut",
            "2026-05-10 09:30",
            "Ada",
            "ada@example.com",
            "--gift",
            "GC-1",
        ]))
        .unwrap_err();
        assert!(matches!(err, CliError::Input(ref msg) if msg.contains("CODE:CENTS")));
    }

    #[test]
    fn start_accepts_rfc3339_with_offset() {
        let parsed = parse_start("2026-05-10T11:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-05-10T09:30:00+00:00");
        assert!(parse_start("next tuesday").is_err());
    }
}
