//! Command handlers. Each one loads a snapshot from the file store, builds
//! its view with the core report functions and prints it.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tracing::{debug, warn};

use fieldbook_core::aggregate::service_year_series;
use fieldbook_core::applications::applications_for;
use fieldbook_core::models::{watch_for_group, watch_for_month};
use fieldbook_core::period::service_year_of;
use fieldbook_core::reports::{consolidated as consolidate, group_report, NO_GROUP};
use fieldbook_core::store::{documents_from_export, COLLECTIONS};
use fieldbook_core::utils::{contains_ignore_case, format_hours, truncate_string};
use fieldbook_core::{
    Config, Dashboard, EditSession, FileStore, MonthlySummary, Publisher, ReportFilter, Snapshot,
};

/// Width of name columns
const NAME_WIDTH: usize = 28;

pub struct Context {
    pub config: Config,
    pub filter: ReportFilter,
    pub window: usize,
    pub json: bool,
    store: FileStore,
}

impl Context {
    pub async fn open(config: Config, filter: ReportFilter, window: usize, json: bool) -> Result<Self> {
        let dir = config.data_dir()?;
        let store = FileStore::open(&dir)
            .await
            .with_context(|| format!("opening store at {}", dir.display()))?;
        if store.any_stale(config.stale_minutes) {
            debug!(dir = %dir.display(), "Store has stale or missing collections");
        }
        Ok(Self {
            config,
            filter,
            window,
            json,
            store,
        })
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::load(&self.store).await.context("loading snapshot")
    }

    fn heading(&self, title: &str) {
        let group = self.filter.group().unwrap_or("todos los grupos");
        println!("{} - {} ({})", title, self.filter.period(), group);
        println!();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &MonthlySummary) {
    println!("{:<14} {:>8} {:>8} {:>8}", "", "Informes", "Horas", "Cursos");
    for (label, totals) in [
        ("Publicadores", &summary.publishers),
        ("Auxiliares", &summary.auxiliaries),
        ("Regulares", &summary.regulars),
    ] {
        println!(
            "{:<14} {:>8} {:>8} {:>8}",
            label,
            totals.count,
            format_hours(totals.hours),
            totals.courses
        );
    }
    println!(
        "{:<14} {:>8} {:>8} {:>8}",
        "Total",
        summary.total_count(),
        format_hours(summary.total_hours()),
        summary.total_courses()
    );
}

fn print_names<'a>(names: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) {
    let mut count = 0;
    for (name, group) in names {
        println!(
            "  {:<width$} {}",
            truncate_string(name, NAME_WIDTH),
            group.unwrap_or(NO_GROUP),
            width = NAME_WIDTH
        );
        count += 1;
    }
    if count == 0 {
        println!("  (ninguno)");
    }
}

pub async fn import(ctx: &Context, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let export: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", file.display()))?;

    let collections = documents_from_export(export)?;
    if collections.is_empty() {
        warn!(file = %file.display(), "Export contained no known collections");
    }
    for (collection, docs) in collections {
        let count = docs.len();
        ctx.store.import(collection, docs).await?;
        println!("{:<14} {:>6} documentos", collection, count);
    }
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    println!("Datos: {}", ctx.store.dir().display());
    println!();
    let counts = [
        snapshot.publishers.len(),
        snapshot.reports.len(),
        snapshot.applications.len(),
        snapshot.watch.len(),
    ];
    for (collection, count) in COLLECTIONS.iter().zip(counts) {
        println!("{:<14} {:>6}   {}", collection, count, ctx.store.age_display(collection));
    }
    if ctx.store.any_stale(ctx.config.stale_minutes) {
        println!();
        println!("Algunas colecciones tienen más de {} minutos.", ctx.config.stale_minutes);
    }
    let groups = snapshot.groups();
    if !groups.is_empty() {
        println!();
        println!("Grupos: {}", groups.join(", "));
    }
    Ok(())
}

pub async fn summary(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let dashboard = Dashboard::build(&snapshot, &ctx.filter, ctx.window);
    if ctx.json {
        return print_json(&dashboard);
    }

    ctx.heading("Resumen");
    print_summary(&dashboard.summary);
    println!();
    println!("Últimos {} meses:", ctx.window);
    println!("  Precursores regulares   {:>5}", dashboard.window.regular_pioneers);
    println!("  Publicadores activos    {:>5}", dashboard.window.active_reporting);
    println!("  Precursores auxiliares  {:>5}", dashboard.window.auxiliaries);
    println!();
    println!(
        "Pendientes: {}  Irregulares: {}  Nuevos inactivos: {}",
        dashboard.pending.len(),
        dashboard.irregular.len(),
        dashboard.newly_inactive.len()
    );
    Ok(())
}

pub async fn pending(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let dashboard = Dashboard::build(&snapshot, &ctx.filter, ctx.window);
    if ctx.json {
        return print_json(&dashboard.pending);
    }
    ctx.heading("Sin informe");
    print_names(
        dashboard
            .pending
            .iter()
            .map(|p| (p.name.as_str(), p.group.as_deref())),
    );
    Ok(())
}

pub async fn irregular(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let dashboard = Dashboard::build(&snapshot, &ctx.filter, ctx.window);
    if ctx.json {
        return print_json(&dashboard.irregular);
    }
    ctx.heading(&format!("Irregulares (últimos {} meses)", ctx.window));
    if dashboard.irregular.is_empty() {
        println!("  (ninguno)");
    }
    for entry in &dashboard.irregular {
        println!(
            "  {:<width$} {}",
            truncate_string(&entry.publisher.name, NAME_WIDTH),
            entry.missed.join(" "),
            width = NAME_WIDTH
        );
    }
    Ok(())
}

pub async fn inactive(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let dashboard = Dashboard::build(&snapshot, &ctx.filter, ctx.window);
    if ctx.json {
        return print_json(&dashboard.newly_inactive);
    }
    ctx.heading("Nuevos inactivos");
    print_names(
        dashboard
            .newly_inactive
            .iter()
            .map(|p| (p.name.as_str(), p.group.as_deref())),
    );
    Ok(())
}

pub async fn consolidated(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let report = consolidate(&snapshot, ctx.filter.period());
    if ctx.json {
        return print_json(&report);
    }

    println!("Consolidado - {}", report.period);
    println!();
    println!(
        "{:<20} {:>6} {:>6} {:>8} {:>6} {:>8} {:>7}",
        "Grupo", "Pub.", "Aux.", "Horas", "Reg.", "Horas", "Cursos"
    );
    let rows = report
        .groups
        .iter()
        .map(|g| (g.group.as_str(), &g.summary))
        .chain(std::iter::once(("Total", &report.total)));
    for (name, s) in rows {
        println!(
            "{:<20} {:>6} {:>6} {:>8} {:>6} {:>8} {:>7}",
            truncate_string(name, 20),
            s.publishers.count,
            s.auxiliaries.count,
            format_hours(s.auxiliaries.hours),
            s.regulars.count,
            format_hours(s.regulars.hours),
            s.total_courses()
        );
    }
    Ok(())
}

pub async fn chart(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let period = ctx.filter.period();
    let service_year = service_year_of(period);
    let series = service_year_series(&snapshot.publishers, &snapshot.reports, period.month, service_year);
    if ctx.json {
        return print_json(&series);
    }

    println!("Año de servicio {} hasta {}", service_year, period.month);
    println!();
    println!("{:<10} {:>8} {:>8} {:>7}", "Mes", "Informes", "Horas", "Cursos");
    for s in &series {
        println!(
            "{:<10} {:>8} {:>8} {:>7}",
            s.period.label(),
            s.total_count(),
            format_hours(s.total_hours()),
            s.total_courses()
        );
    }
    Ok(())
}

pub async fn report(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let rows = group_report(&snapshot, &ctx.filter);
    if ctx.json {
        return print_json(&rows);
    }

    ctx.heading("Informes");
    println!(
        "{:<width$} {:>4} {:>4} {:>7} {:>6}  {}",
        "Nombre", "Part", "PA", "Horas", "Cursos", "Notas",
        width = NAME_WIDTH
    );
    for row in &rows {
        let r = &row.report;
        println!(
            "{:<width$} {:>4} {:>4} {:>7} {:>6}  {}",
            truncate_string(&row.publisher.display_name(), NAME_WIDTH),
            if r.participated { "sí" } else { "" },
            if r.is_auxiliary() { "PA" } else { "" },
            r.hours.map(format_hours).unwrap_or_default(),
            r.bible_courses.map(|c| c.to_string()).unwrap_or_default(),
            truncate_string(&r.notes, 30),
            width = NAME_WIDTH
        );
    }
    Ok(())
}

/// Field changes requested by `record`.
pub struct RecordEdit {
    pub participated: Option<bool>,
    pub auxiliary: Option<bool>,
    pub hours: Option<String>,
    pub courses: Option<String>,
    pub notes: Option<String>,
}

/// Match on id first, then on a unique name fragment.
fn find_publisher<'a>(publishers: impl Iterator<Item = &'a Publisher> + Clone, query: &str) -> Result<&'a Publisher> {
    if let Some(p) = publishers.clone().find(|p| p.id == query) {
        return Ok(p);
    }
    let needle = query.to_lowercase();
    let matches: Vec<&Publisher> = publishers
        .filter(|p| contains_ignore_case(&p.full_name(), &needle))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => anyhow::bail!("No active publisher matches '{}'", query),
        many => anyhow::bail!(
            "'{}' matches {} publishers: {}",
            query,
            many.len(),
            many.iter().map(|p| p.full_name()).collect::<Vec<_>>().join(", ")
        ),
    }
}

pub async fn record(ctx: &Context, query: &str, edit: RecordEdit) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let rows = group_report(&snapshot, &ctx.filter);
    let publisher = find_publisher(rows.iter().map(|r| &r.publisher), query)?.clone();
    let mut session =
        EditSession::for_publisher(rows, &publisher.id).context("publisher row disappeared")?;
    let row = 0;

    if let Some(participated) = edit.participated {
        session.set_participation(row, participated)?;
    }
    if let Some(auxiliary) = edit.auxiliary {
        session.set_auxiliary(row, auxiliary)?;
    }
    if let Some(ref hours) = edit.hours {
        session.set_hours_text(row, hours)?;
    }
    if let Some(ref courses) = edit.courses {
        session.set_courses_text(row, courses)?;
    }
    if let Some(ref notes) = edit.notes {
        session.set_notes(row, notes)?;
    }

    if !session.is_dirty() {
        println!("Sin cambios para {}", publisher.display_name());
        return Ok(());
    }
    let saved = session.save(&ctx.store).await?;
    debug!(saved, "Record command saved reports");
    println!("Informe de {} guardado ({})", publisher.display_name(), ctx.filter.period());
    Ok(())
}

pub async fn applications(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let covering = applications_for(&snapshot, ctx.filter.period());
    if ctx.json {
        return print_json(&covering);
    }
    println!("Precursores auxiliares aprobados - {}", ctx.filter.period());
    println!();
    if covering.is_empty() {
        println!("  (ninguno)");
    }
    for app in covering {
        let months = if app.continuous { "De continuo" } else { app.months.as_str() };
        println!(
            "  {:<width$} {}",
            truncate_string(&app.name, NAME_WIDTH),
            months,
            width = NAME_WIDTH
        );
    }
    Ok(())
}

pub async fn watch(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot().await?;
    let mut entries = watch_for_month(&snapshot.watch, ctx.filter.period());
    if let Some(group) = ctx.filter.group() {
        let in_group = watch_for_group(&snapshot.watch, group);
        entries.retain(|a| in_group.contains(a));
    }
    if ctx.json {
        return print_json(&entries);
    }

    ctx.heading("Guardias");
    if entries.is_empty() {
        println!("  (sin asignaciones)");
    }
    for a in entries {
        let lead = a
            .lead_publisher_id
            .as_deref()
            .and_then(|id| snapshot.publisher(id))
            .map(|p| p.display_name())
            .unwrap_or_default();
        println!("  {}  {:<16} {:<width$} {}", a.formatted_date(), a.group, lead, a.notes, width = NAME_WIDTH);
    }
    Ok(())
}
