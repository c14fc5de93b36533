use std::{
    env,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::{Command, Stdio},
};

use anyhow::{Context as _, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use collendar::{
    app::{AppState, SyncStatus},
    calendar::{CalendarDraft, CalendarMonth, Event, EventDraft, MonthGrid, Permission, Recurrence, ShareRequest},
    storage::{cache::Cache, config::Config},
    sync::{
        api::{CollendarApi, CollendarClient},
        session::{Session, SessionStore},
        sync_engine::SyncEngine,
        wire::local_datetime,
    },
    ui::month_view::{agenda_line, day_heading, render_day_agenda, render_month},
};

#[derive(Parser)]
#[command(name = "collendar")]
#[command(about = "Shared calendars from the terminal")]
pub struct Cli {
    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// List calendars you own or that were shared with you
    Calendars,
    Calendar {
        #[command(subcommand)]
        action: CalendarCommand,
    },
    /// Show a month grid (YYYY/MM, defaults to the current month)
    Month {
        month: Option<String>,
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Show one day's events (YYYY/MM/DD, defaults to today)
    Agenda {
        date: Option<String>,
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// List the events of a calendar in one month
    Events {
        calendar: String,
        #[arg(short, long)]
        month: Option<String>,
    },
    Event {
        #[command(subcommand)]
        action: EventCommand,
    },
    Share {
        #[command(subcommand)]
        action: ShareCommand,
    },
    /// Find users by name
    Users { query: String },
}

#[derive(Subcommand)]
pub enum CalendarCommand {
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Delete { id: String },
}

#[derive(Args)]
pub struct EventFields {
    /// Start date/time (e.g. "2025-11-21T10:00", or "2025-11-21" with --all-day)
    #[arg(short, long)]
    pub start: Option<String>,
    #[arg(short, long)]
    pub end: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub location: Option<String>,
    #[arg(long)]
    pub all_day: Option<bool>,
    #[arg(long)]
    pub color: Option<String>,
    /// daily, weekly, monthly or yearly
    #[arg(long)]
    pub repeat: Option<Recurrence>,
}

#[derive(Subcommand)]
pub enum EventCommand {
    Show { id: String },
    Create {
        calendar: String,
        title: String,
        #[command(flatten)]
        fields: EventFields,
    },
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: EventFields,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ShareCommand {
    List { calendar: String },
    Add {
        calendar: String,
        email: String,
        /// view or edit
        #[arg(short, long, default_value = "view")]
        permission: Permission,
    },
    Update { id: String, permission: Permission },
    Remove { id: String },
}

struct Context {
    config: Config,
    client: CollendarClient,
    store: SessionStore,
}

impl Context {
    fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_or_create_at(&path),
            None => Config::load_or_create(),
        }
        .context("Failed to load config")?;
        let client = CollendarClient::with_timeout(&config.api.base_url, config.timeout())?;
        let store = SessionStore::new(config.session.file.clone());
        Ok(Self { config, client, store })
    }

    fn session(&self) -> Result<Session> {
        match self.store.load()? {
            Some(session) => Ok(session),
            None => bail!("Not logged in.\n\nSign in with:\n  collendar login <EMAIL>"),
        }
    }

    fn engine(self) -> Result<(SyncEngine<CollendarClient>, Config)> {
        let session = self.session()?;
        let mut engine = SyncEngine::new(self.client, session);
        if self.config.cache.enabled {
            match Cache::open(&self.config.cache.path) {
                Ok(cache) => engine = engine.with_cache(cache),
                Err(e) => tracing::warn!("Cache unavailable, continuing without it: {}", e),
            }
        }
        Ok((engine, self.config))
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.config)?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let session = ctx.client.login(&email, &password).await?;
            ctx.store.save(&session)?;
            println!("Logged in as {} <{}>", session.user.name, session.user.email);
        }
        Commands::Register { name, email, password } => {
            let password = read_password(password)?;
            let user = ctx.client.register(&name, &email, &password).await?;
            println!("Account created for {} <{}>", user.name, user.email);
            println!("Sign in with:\n  collendar login {}", user.email);
        }
        Commands::Logout => {
            ctx.store.clear()?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let session = ctx.session()?;
            println!("{} <{}> (id {})", session.user.name, session.user.email, session.user.id);
            println!("Server: {}", ctx.client.base_url());
        }
        Commands::Calendars => {
            let (engine, _) = ctx.engine()?;
            let mut state = AppState::new();
            engine.refresh_calendars(&mut state).await?;
            print_offline_notice(&state);
            if state.calendars.is_empty() {
                println!("No calendars yet. Create one with:\n  collendar calendar create <NAME>");
            }
            for calendar in &state.calendars {
                println!(
                    "{:>6}  {}  {:<28} {}",
                    calendar.id,
                    calendar.color,
                    calendar.name,
                    calendar.access_label()
                );
            }
        }
        Commands::Calendar { action } => run_calendar(ctx, action).await?,
        Commands::Month { month, calendar } => {
            let (engine, config) = ctx.engine()?;
            let month = month.as_deref().map(str::parse::<CalendarMonth>).transpose()?;
            let state = load_month(&engine, calendar.as_deref(), month).await?;
            let grid = state.grid()?;
            println!("{}", render_month(&grid));
            print_offline_notice(&state);
            let agenda = format_month_agenda(&grid, &config);
            if !agenda.is_empty() {
                println!("\n{}", agenda);
            }
        }
        Commands::Agenda { date, calendar } => {
            let date = match date.as_deref() {
                Some(value) => parse_date(value)?,
                None => chrono::Local::now().date_naive(),
            };
            let (engine, config) = ctx.engine()?;
            let state = load_month(&engine, calendar.as_deref(), Some(CalendarMonth::containing(date))).await?;
            print_offline_notice(&state);
            let agenda = render_day_agenda(date, &state.events_for_date(date), &config.ui.time_format);
            display_with_pager(&agenda)?;
        }
        Commands::Events { calendar, month } => {
            let (engine, config) = ctx.engine()?;
            let month = month.as_deref().map(str::parse::<CalendarMonth>).transpose()?;
            let state = load_month(&engine, Some(&calendar), month).await?;
            print_offline_notice(&state);
            let listing = format_event_listing(&state.events, &config);
            display_with_pager(&listing)?;
        }
        Commands::Event { action } => run_event(ctx, action).await?,
        Commands::Share { action } => run_share(ctx, action).await?,
        Commands::Users { query } => {
            let session = ctx.session()?;
            let users = ctx.client.search_users(&session, &query).await?;
            if users.is_empty() {
                println!("No users match '{}'", query);
            }
            for user in users {
                println!("{:>6}  {} <{}>", user.id, user.name, user.email);
            }
        }
    }

    Ok(())
}

async fn run_calendar(ctx: Context, action: CalendarCommand) -> Result<()> {
    let (engine, config) = ctx.engine()?;
    let mut state = AppState::new();

    match action {
        CalendarCommand::Create { name, description, color } => {
            let mut draft = CalendarDraft::new(name)
                .with_color(color.unwrap_or_else(|| config.ui.default_color.clone()));
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            let calendar = engine.create_calendar(&mut state, &draft).await?;
            println!("Created calendar {} ({})", calendar.name, calendar.id);
        }
        CalendarCommand::Update { id, name, description, color } => {
            engine.refresh_calendars(&mut state).await?;
            let Some(existing) = state.calendars.iter().find(|c| c.id == id) else {
                bail!("Calendar '{}' not found", id);
            };
            let mut draft = CalendarDraft::from(existing);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(description) = description {
                draft.description = Some(description);
            }
            if let Some(color) = color {
                draft.color = color;
            }
            let calendar = engine.api().update_calendar(engine.session(), &id, &draft).await?;
            println!("Updated calendar {} ({})", calendar.name, calendar.id);
        }
        CalendarCommand::Delete { id } => {
            engine.delete_calendar(&mut state, &id).await?;
            println!("Deleted calendar {}", id);
        }
    }

    Ok(())
}

async fn run_event(ctx: Context, action: EventCommand) -> Result<()> {
    let (engine, config) = ctx.engine()?;
    let mut state = AppState::new();

    match action {
        EventCommand::Show { id } => {
            let event = engine.api().get_event(engine.session(), &id).await?;
            println!("{}", format_event_details(&event, &config));
        }
        EventCommand::Create { calendar, title, fields } => {
            let start = parse_datetime(fields.start.as_deref().context("--start is required")?)?;
            let end = match fields.end.as_deref() {
                Some(end) => parse_datetime(end)?,
                None => start + chrono::Duration::hours(1),
            };
            let mut draft = EventDraft::new(calendar, title, start, end);
            apply_fields(&mut draft, fields)?;
            state.select_calendar(&draft.calendar_id);
            let event = engine.create_event(&mut state, &draft).await?;
            println!("Created event {} ({})", event.title, event.id);
        }
        EventCommand::Update { id, title, fields } => {
            let existing = engine.api().get_event(engine.session(), &id).await?;
            let mut draft = existing.to_draft();
            if let Some(title) = title {
                draft.title = title;
            }
            apply_fields(&mut draft, fields)?;
            state.select_calendar(&draft.calendar_id);
            let event = engine.update_event(&mut state, &id, &draft).await?;
            println!("Updated event {} ({})", event.title, event.id);
        }
        EventCommand::Delete { id } => {
            engine.delete_event(&mut state, &id).await?;
            println!("Deleted event {}", id);
        }
    }

    Ok(())
}

async fn run_share(ctx: Context, action: ShareCommand) -> Result<()> {
    let session = ctx.session()?;

    match action {
        ShareCommand::List { calendar } => {
            let shares = ctx.client.list_shares(&session, &calendar).await?;
            if shares.is_empty() {
                println!("Calendar {} is not shared with anyone", calendar);
            }
            for share in shares {
                println!(
                    "{:>6}  {:<24} {:<32} {}",
                    share.id,
                    share.user_name,
                    share.user_email.as_deref().unwrap_or("-"),
                    share.permission
                );
            }
        }
        ShareCommand::Add { calendar, email, permission } => {
            let request = ShareRequest::new(calendar, email, permission);
            let share = ctx.client.share_calendar(&session, &request).await?;
            println!("Shared with {} ({})", share.user_name, share.permission);
        }
        ShareCommand::Update { id, permission } => {
            let share = ctx.client.update_share_permission(&session, &id, permission).await?;
            println!("{} can now {}", share.user_name, share.permission);
        }
        ShareCommand::Remove { id } => {
            ctx.client.remove_share(&session, &id).await?;
            println!("Removed share {}", id);
        }
    }

    Ok(())
}

async fn load_month(
    engine: &SyncEngine<CollendarClient>,
    calendar: Option<&str>,
    month: Option<CalendarMonth>,
) -> Result<AppState> {
    let mut state = AppState::new();
    engine.refresh_calendars(&mut state).await?;

    if let Some(calendar) = calendar {
        if !state.calendars.iter().any(|c| c.id == calendar) {
            let available: Vec<_> = state.calendars.iter().map(|c| c.id.as_str()).collect();
            bail!("Calendar '{}' not found. Available: {}", calendar, available.join(", "));
        }
        state.select_calendar(calendar);
    }
    if state.active_calendar.is_none() {
        bail!("No calendars yet. Create one with:\n  collendar calendar create <NAME>");
    }
    if let Some(month) = month {
        state.show_month(month);
    }

    engine.refresh_month(&mut state).await?;
    Ok(state)
}

fn read_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn apply_fields(draft: &mut EventDraft, fields: EventFields) -> Result<()> {
    if let Some(start) = fields.start.as_deref() {
        draft.start_at = parse_datetime(start)?;
    }
    if let Some(end) = fields.end.as_deref() {
        draft.end_at = parse_datetime(end)?;
    }
    if let Some(description) = fields.description {
        draft.description = Some(description);
    }
    if let Some(location) = fields.location {
        draft.location = Some(location);
    }
    if let Some(all_day) = fields.all_day {
        draft.all_day = all_day;
    }
    if let Some(color) = fields.color {
        draft.color = Some(color);
    }
    if let Some(recurrence) = fields.repeat {
        draft.recurrence = Some(recurrence);
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .with_context(|| format!("Invalid date '{}'. Use YYYY/MM/DD.", value))
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = local_datetime::parse(&value.replacen(' ', "T", 1)) {
        return Ok(parsed);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Invalid date/time '{}'. Use YYYY-MM-DDTHH:MM.", value))
}

fn print_offline_notice(state: &AppState) {
    if state.sync_status == SyncStatus::Offline {
        println!("(offline: showing cached data)");
    }
}

fn format_month_agenda(grid: &MonthGrid, config: &Config) -> String {
    grid.cells()
        .iter()
        .filter(|cell| cell.belongs_to_displayed_month)
        .flat_map(|cell| {
            cell.events.iter().map(move |event| {
                format!(
                    "{}  {}",
                    cell.date.format(&config.ui.date_format),
                    agenda_line(event, &config.ui.time_format)
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_event_listing(events: &[Event], config: &Config) -> String {
    if events.is_empty() {
        return "No events this month.".to_string();
    }
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|event| event.start_at);

    let mut lines = Vec::new();
    let mut current_day = None;
    for event in sorted {
        let day = event.start_date();
        if current_day != Some(day) {
            if current_day.is_some() {
                lines.push(String::new());
            }
            let on_day: Vec<&Event> = events.iter().filter(|e| e.start_date() == day).collect();
            lines.push(day_heading(day));
            lines.extend(on_day.iter().map(|e| {
                format!("  {:>6}  {}", e.id, agenda_line(e, &config.ui.time_format))
            }));
            current_day = Some(day);
        }
    }
    lines.join("\n")
}

fn format_event_details(event: &Event, config: &Config) -> String {
    let when = if event.all_day {
        format!("{} (all day)", event.start_at.format(&config.ui.date_format))
    } else {
        let pattern = format!("{} {}", config.ui.date_format, config.ui.time_format);
        format!("{} - {}", event.start_at.format(&pattern), event.end_at.format(&pattern))
    };

    let mut lines = vec![
        event.title.clone(),
        format!("  id:        {}", event.id),
        format!("  calendar:  {}", event.calendar_id),
        format!("  when:      {}", when),
    ];
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("  where:     {}", location));
    }
    if let Some(recurrence) = event.recurrence {
        lines.push(format!("  repeats:   {}", recurrence.label()));
    }
    if let Some(color) = &event.color {
        lines.push(format!("  color:     {}", color));
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push(description.to_string());
    }
    lines.join("\n")
}

fn display_with_pager(text: &str) -> Result<(), io::Error> {
    let pager_value = env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let mut parts = pager_value.split_whitespace();
    let cmd = match parts.next() {
        Some(c) => c,
        None => {
            println!("{text}");
            return Ok(());
        }
    };
    let args: Vec<&str> = parts.collect();

    match Command::new(cmd).args(&args).stdin(Stdio::piped()).spawn() {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                stdin.write_all(text.as_bytes())?;
            }
            let _ = child.wait();
        }
        Err(_) => {
            println!("{text}");
        }
    }

    Ok(())
}
