//! CircDesk terminal: the interactive circulation desk
//!
//! One tokio event loop multiplexes operator commands from stdin with
//! completions of queue actions running in the background. Log output goes
//! to rolling files; stdout belongs to the desk itself.

use std::io::Write as _;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circdesk::client::{CirculationGateway, Gateway};
use circdesk::config::AppConfig;
use circdesk::desk::{
    format_date, parse_date_input, Notice, NoticeLevel, QueueAction, RecordCreate, RecordForm,
    RecordSearch, RequestQueue, ReturnEntry, SearchMode, SearchState,
};
use circdesk::models::{BorrowDetail, BorrowRecord, BorrowStatus, LibraryCard, Tone};
use circdesk::workflow;
use circdesk::{AppError, AppResult, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Logs go to rolling files; stdout is the desk surface.
    let file_appender =
        tracing_appender::rolling::daily(&config.logging.directory, &config.logging.file_prefix);
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("circdesk={}", config.logging.level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Starting CircDesk v{}", env!("CARGO_PKG_VERSION"));

    let session = Arc::new(Session::new(config.initial_token()));
    let gateway: Arc<dyn CirculationGateway> =
        Arc::new(Gateway::new(&config.backend, Arc::clone(&session))?);

    println!("CircDesk, circulation desk for {}", config.backend.base_url);
    if !session.is_active().await {
        println!("No session token configured; paste one with: token <value>");
    }
    println!("Type help for the command list.");

    let mut desk = Desk::new(gateway, session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if desk.run(&line).await == Flow::Quit {
                            break;
                        }
                        prompt();
                    }
                    None => break,
                }
            }
            Some(outcome) = desk.queue.next_completion(), if desk.queue.has_pending_tasks() => {
                let verb = match outcome.action {
                    QueueAction::Approve => "approved",
                    QueueAction::Reject => "rejected",
                };
                match &outcome.result {
                    Ok(()) => show(Notice::success(format!(
                        "Request {} {}",
                        outcome.record_id, verb
                    ))),
                    Err(err) => {
                        show(Notice::from_error(err));
                        if err.requires_login() {
                            println!("Paste a fresh token with: token <value>");
                        }
                    }
                }
                prompt();
            }
        }
    }

    tracing::info!("CircDesk shutting down");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// All screen state behind the prompt. The queue runs its actions in the
/// background; every other screen awaits its operation at the prompt.
struct Desk {
    gateway: Arc<dyn CirculationGateway>,
    session: Arc<Session>,
    queue: RequestQueue,
    borrow_search: RecordSearch,
    return_search: RecordSearch,
    form: RecordForm,
    create: RecordCreate,
}

impl Desk {
    fn new(gateway: Arc<dyn CirculationGateway>, session: Arc<Session>) -> Self {
        Self {
            queue: RequestQueue::new(Arc::clone(&gateway)),
            borrow_search: RecordSearch::new(Arc::clone(&gateway), SearchMode::Borrow),
            return_search: RecordSearch::new(Arc::clone(&gateway), SearchMode::Return),
            form: RecordForm::new(Arc::clone(&gateway)),
            create: RecordCreate::new(Arc::clone(&gateway)),
            gateway,
            session,
        }
    }

    async fn run(&mut self, line: &str) -> Flow {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Flow::Continue;
        }
        let (command, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, tail)) => (head.to_lowercase(), tail.trim()),
            None => (trimmed.to_lowercase(), ""),
        };
        match self.dispatch(&command, rest).await {
            Ok(flow) => flow,
            Err(err) => {
                show(Notice::from_error(&err));
                if err.requires_login() {
                    println!("Paste a fresh token with: token <value>");
                }
                Flow::Continue
            }
        }
    }

    async fn dispatch(&mut self, command: &str, rest: &str) -> AppResult<Flow> {
        match command {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => help(),

            // Session
            "token" => {
                if rest.is_empty() {
                    return Err(AppError::Validation("Usage: token <value>".to_string()));
                }
                self.session.set_token(rest).await;
                show(Notice::success("Session token updated"));
            }
            "logout" => {
                self.session.invalidate().await;
                show(Notice::success("Session cleared"));
            }

            // Overview
            "summary" => {
                let records = self.gateway.list_records().await?;
                render_summary(&records);
            }

            // Pending-request queue
            "pending" => {
                self.queue.refresh().await?;
                render_queue(&self.queue);
            }
            "approve" | "reject" => {
                let id = parse_id(rest, "record id")?;
                let action = if command == "approve" {
                    QueueAction::Approve
                } else {
                    QueueAction::Reject
                };
                self.queue.dispatch(id, action)?;
                show(Notice::success(format!(
                    "Request {}: {} dispatched",
                    id,
                    action.label()
                )));
            }

            // Borrow desk
            "borrow" => {
                self.borrow_search.search(rest).await?;
                render_search(&self.borrow_search);
            }
            "handout" => {
                self.borrow_search.hand_out().await?;
                show(Notice::success("Copies handed out"));
                render_search(&self.borrow_search);
            }

            // Return desk
            "return" => {
                self.return_search.search(rest).await?;
                render_search(&self.return_search);
            }
            "mark" => {
                let (line_id, entry) = parse_return_args(rest, true)?;
                self.return_search.return_detail(line_id, entry).await?;
                show(Notice::success(format!("Line {} returned", line_id)));
                render_search(&self.return_search);
            }
            "unmark" => {
                let (line_id, entry) = parse_return_args(rest, false)?;
                self.return_search.return_detail(line_id, entry).await?;
                show(Notice::success(format!("Line {} back out", line_id)));
                render_search(&self.return_search);
            }
            "complete" => {
                let code = optional_text(rest);
                self.return_search.complete_return(code).await?;
                show(Notice::success("Record closed as Returned"));
                render_search(&self.return_search);
            }

            // Record form
            "open" => {
                let id = parse_id(rest, "record id")?;
                self.form.load(id).await?;
                render_form(&self.form);
            }
            "status" => {
                let status: BorrowStatus = rest
                    .parse()
                    .map_err(AppError::Validation)?;
                self.form.select_status(status)?;
                show(Notice::success(format!("Status staged: {}", status)));
            }
            "note" => {
                self.form.set_notes(optional_text(rest))?;
                show(Notice::success("Notes staged"));
            }
            "violation" => {
                self.form.select_violation(optional_text(rest))?;
                show(Notice::success("Violation staged"));
            }
            "update" => {
                let (line_id, entry) = parse_return_args(rest, true)?;
                self.form.return_detail(line_id, entry).await?;
                show(Notice::success(format!("Line {} returned", line_id)));
                render_form(&self.form);
            }
            "save" => {
                self.form.save().await?;
                show(Notice::success("Record saved"));
                render_form(&self.form);
            }

            // Record creation
            "create" => {
                self.create = RecordCreate::new(Arc::clone(&self.gateway));
                self.create.load_cards().await?;
                show(Notice::success(format!(
                    "{} activated cards available; pick one with: pick <id>",
                    self.create.search_cards("").len()
                )));
            }
            "cards" => {
                render_cards(&self.create.search_cards(rest));
            }
            "pick" => {
                let id = parse_id(rest, "card id")?;
                self.create.select_card(id)?;
                if let Some(card) = self.create.selected_card() {
                    show(Notice::success(format!(
                        "Card {} ({}) selected",
                        card.card_number, card.holder_name
                    )));
                }
            }
            "scan" => {
                let (barcode, title, condition) = {
                    let item = self.create.add_barcode(rest).await?;
                    (
                        item.barcode.clone(),
                        item.book.title.clone(),
                        item.condition_label(),
                    )
                };
                show(Notice::success(format!(
                    "Added {} \"{}\" [{}] ({} in cart)",
                    barcode,
                    title,
                    condition,
                    self.create.cart().len()
                )));
            }
            "unscan" => {
                self.create.remove_barcode(rest)?;
                show(Notice::success(format!(
                    "Removed; {} in cart",
                    self.create.cart().len()
                )));
            }
            "from" => {
                self.create.set_borrow_date(parse_date_input(rest)?)?;
                show(Notice::success(format!(
                    "Borrow date {}",
                    format_date(self.create.borrow_date())
                )));
            }
            "due" => {
                self.create.set_due_date(parse_date_input(rest)?)?;
                show(Notice::success(format!(
                    "Due date {}",
                    format_date(self.create.due_date())
                )));
            }
            "memo" => {
                self.create.set_notes(optional_text(rest));
                show(Notice::success("Request notes staged"));
            }
            "submit" => {
                let record = self.create.submit().await?;
                show(Notice::success(format!(
                    "Created {} for {} ({})",
                    record.record_code, record.holder_name, record.card_number
                )));
            }

            _ => {
                return Err(AppError::Validation(format!(
                    "Unknown command {:?}; type help",
                    command
                )));
            }
        }
        Ok(Flow::Continue)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_id(rest: &str, what: &str) -> AppResult<i64> {
    rest.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("{:?} is not a {}", rest.trim(), what)))
}

fn optional_text(rest: &str) -> Option<String> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `<line> [yyyy-mm-dd] [violation code...]`; the code may contain spaces.
fn parse_return_args(rest: &str, returned: bool) -> AppResult<(i64, ReturnEntry)> {
    let mut parts = rest.split_whitespace();
    let line_id = parts.next().ok_or_else(|| {
        AppError::Validation("Usage: mark <line> [yyyy-mm-dd] [violation code]".to_string())
    })?;
    let line_id: i64 = line_id
        .parse()
        .map_err(|_| AppError::Validation(format!("{:?} is not a line id", line_id)))?;
    let tokens: Vec<&str> = parts.collect();
    let (return_date, code_tokens) = match tokens.first().map(|t| parse_date_input(t)) {
        Some(Ok(date)) => (Some(date), &tokens[1..]),
        _ => (None, &tokens[..]),
    };
    let violation_code = if code_tokens.is_empty() {
        None
    } else {
        Some(code_tokens.join(" "))
    };
    Ok((
        line_id,
        ReturnEntry {
            returned,
            return_date,
            notes: None,
            violation_code,
        },
    ))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";

fn tone_code(tone: Tone) -> &'static str {
    match tone {
        Tone::Warning => "\x1b[33m",
        Tone::Info => "\x1b[36m",
        Tone::Accent => "\x1b[35m",
        Tone::Success => "\x1b[32m",
        Tone::Danger => "\x1b[31m",
    }
}

fn paint(status: BorrowStatus) -> String {
    format!("{}{}{}", tone_code(status.tone()), status.label(), RESET)
}

fn show(notice: Notice) {
    let code = match notice.level {
        NoticeLevel::Success => "\x1b[32m",
        NoticeLevel::Warning => "\x1b[33m",
        NoticeLevel::Error => "\x1b[31m",
    };
    println!("{}{}{}", code, notice.message, RESET);
}

fn prompt() {
    print!("desk> ");
    let _ = std::io::stdout().flush();
}

fn render_summary(records: &[BorrowRecord]) {
    println!("{} borrow records", records.len());
    for (status, count) in workflow::status_breakdown(records) {
        println!(
            "  {}{:<12}{} {:>5}",
            tone_code(status.tone()),
            status.label(),
            RESET,
            count
        );
    }
    let overdue = workflow::overdue_count(records, Local::now().date_naive());
    if overdue > 0 {
        println!("  {:<12} {:>5}", "overdue", overdue);
    }
    let fines = workflow::outstanding_fines(records);
    if !fines.is_zero() {
        println!("  {:<12} {:>5}", "fines", fines);
    }
}

fn render_queue(queue: &RequestQueue) {
    if queue.rows().is_empty() {
        println!("No pending borrow requests.");
        return;
    }
    println!(
        "{:>6}  {:<18}  {:<10}  {:<10}  card / holder",
        "id", "code", "borrowed", "due"
    );
    for row in queue.rows() {
        let flag = if queue.is_in_flight(row.id) { "  *" } else { "" };
        println!(
            "{:>6}  {:<18}  {:<10}  {:<10}  {} / {}{}",
            row.id,
            row.record_code,
            format_date(row.borrow_date),
            format_date(row.due_date),
            row.card_number,
            row.holder_name,
            flag
        );
    }
    println!("approve <id> / reject <id>; * marks an action in flight");
}

fn render_record(record: &BorrowRecord) {
    println!(
        "{} [{}] {} / {}",
        record.record_code,
        paint(record.status),
        record.card_number,
        record.holder_name
    );
    print!(
        "  borrowed {}  due {}",
        format_date(record.borrow_date),
        format_date(record.due_date)
    );
    if let Some(returned) = record.return_date {
        print!("  returned {}", format_date(returned));
    }
    println!();
    if let Some(fine) = record.fine_amount {
        println!("  fine {}", fine);
    }
    if let Some(notes) = record.notes.as_deref() {
        println!("  notes: {}", notes);
    }
}

fn render_details(details: &[BorrowDetail]) {
    let stats = workflow::record_stats(details);
    println!(
        "  lines ({} of {} books returned):",
        stats.returned_books, stats.total_books
    );
    for detail in details {
        let mark = if detail.is_returned { "x" } else { " " };
        let violation = detail
            .violation
            .as_ref()
            .filter(|v| !v.is_no_violation())
            .map(|v| format!("  [{}]", v.code))
            .unwrap_or_default();
        println!(
            "  [{}] #{:<5} {:<14} x{:<2} {}{}",
            mark,
            detail.id,
            detail.book_item.barcode,
            detail.quantity,
            detail.book_item.book.title,
            violation
        );
    }
}

fn render_search(search: &RecordSearch) {
    match search.state() {
        SearchState::Idle => println!("Search for a record first."),
        SearchState::NotFound { query } => println!("No record matched {:?}.", query),
        SearchState::Loaded(loaded) => {
            render_record(&loaded.record);
            render_details(&loaded.details);
            match search.mode() {
                SearchMode::Borrow => {
                    if loaded.record.status == BorrowStatus::Approved {
                        println!("handout moves this record to Borrowing");
                    }
                }
                SearchMode::Return => {
                    if search.can_complete_return() {
                        println!("complete [violation code] closes this record");
                    } else {
                        println!("mark <line> [yyyy-mm-dd] [violation code] returns one line");
                    }
                }
            }
        }
    }
}

fn render_form(form: &RecordForm) {
    let Some(state) = form.state() else {
        println!("No record open; use: open <id>");
        return;
    };
    render_record(&state.record);
    render_details(&state.details);
    if state.pending_status != state.record.status {
        println!("  staged status: {}", paint(state.pending_status));
    }
    if let Some(code) = state.pending_violation.as_deref() {
        println!("  staged violation: {}", code);
    }
    if state.pending_notes != state.record.notes {
        println!("  staged notes: {}", state.pending_notes.as_deref().unwrap_or("(cleared)"));
    }
}

fn render_cards(cards: &[&LibraryCard]) {
    if cards.is_empty() {
        println!("No matching activated cards.");
        return;
    }
    let today = Local::now().date_naive();
    for card in cards.iter().take(10) {
        let expiry = card
            .expiry_date
            .map(format_date)
            .unwrap_or_else(|| "-".to_string());
        let mut flags = String::new();
        if card.is_expired(today) {
            flags.push_str("  [expired]");
        }
        if card.renewal_requested() {
            flags.push_str("  [renewal requested]");
        }
        println!(
            "{:>6}  {:<12}  {:<24}  expires {}{}",
            card.id, card.card_number, card.holder_name, expiry, flags
        );
    }
    if cards.len() > 10 {
        println!("  ... {} more; narrow the search", cards.len() - 10);
    }
}

fn help() {
    println!(
        "\
session:   token <value> | logout
overview:  summary
queue:     pending | approve <id> | reject <id>
borrow:    borrow <code> | handout
return:    return <code|barcode> | mark <line> [date] [violation] | unmark <line>
           complete [violation]
record:    open <id> | status <name> | note [text] | violation [code]
           update <line> [date] [violation] | save
create:    create | cards [query] | pick <id> | scan <barcode> | unscan <barcode>
           from <date> | due <date> | memo [text] | submit
           (dates are yyyy-mm-dd)
quit:      quit"
    );
}
