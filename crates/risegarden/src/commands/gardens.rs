//! Garden listing and detail handlers.

use risegarden_core::{Coordinator, CoordinatorConfig, Garden};
use tabled::Tabled;

use crate::cli::{GardensArgs, GardensCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct GardenRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Water")]
    water: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Tasks")]
    tasks: String,
}

impl GardenRow {
    pub(crate) fn new(g: &Garden, color: bool) -> Self {
        Self {
            id: g.id.to_string(),
            name: g.name.clone(),
            status: output::online_badge(g.online, color),
            light: light_summary(g),
            water: g
                .water
                .level_percent
                .map_or_else(|| "-".into(), |p| format!("{p}%")),
            temperature: g
                .temperature_c
                .map_or_else(|| "-".into(), |t| format!("{t:.1}°C")),
            tasks: g.pending_task_count.to_string(),
        }
    }
}

fn light_summary(g: &Garden) -> String {
    if g.light.is_on {
        format!("on ({}%)", g.light.brightness)
    } else {
        "off".into()
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

fn detail(g: &Garden, color: bool) -> String {
    let tasks = g
        .tasks
        .major
        .iter()
        .chain(&g.tasks.minor)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    output::detail_block(&[
        ("ID", g.id.to_string()),
        ("Name", g.name.clone()),
        ("Status", output::online_badge(g.online, color)),
        ("Light", light_summary(g)),
        ("Brightness", format!("{}/255", g.brightness_255())),
        ("Water level", or_dash(g.water.level_percent.map(|p| format!("{p}%")))),
        ("Water depth", or_dash(g.water.depth_mm.map(|d| format!("{d:.0} mm")))),
        ("Temperature", or_dash(g.temperature_c.map(|t| format!("{t:.1}°C")))),
        ("Pump", output::switch_badge(g.pump_running, color)),
        ("Pending tasks", g.pending_task_count.to_string()),
        ("Tasks", if tasks.is_empty() { "-".into() } else { tasks }),
        ("Care needed", or_dash(g.tasks.care_needed)),
        ("Next care", or_dash(g.tasks.next_care_at.clone())),
        ("Kit", or_dash(g.kit_id.clone())),
        (
            "Updated",
            or_dash(g.last_updated.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC"))),
        ),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: CoordinatorConfig,
    args: GardensArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let rendered = Coordinator::oneshot(config, |coordinator| async move {
        util::report_failures(&coordinator, global);
        Ok(coordinator.snapshot())
    })
    .await
    .map_err(CliError::from)
    .and_then(|snapshot| match args.command {
        GardensCommand::List => {
            let gardens: Vec<Garden> = snapshot.iter().map(|g| (**g).clone()).collect();
            output::render_list(
                &global.output,
                &gardens,
                |g| GardenRow::new(g, color),
                |g| g.id.to_string(),
            )
        }
        GardensCommand::Get { garden: identifier } => {
            let id = util::resolve_garden(&snapshot, &identifier)?;
            let garden = snapshot.garden(id).ok_or_else(|| CliError::NotFound {
                resource_type: "garden".into(),
                identifier,
                list_command: "gardens list".into(),
            })?;
            output::render_single(
                &global.output,
                &**garden,
                |g| detail(g, color),
                |g| g.id.to_string(),
            )
        }
    })?;

    output::print_output(&rendered, global.quiet);
    Ok(())
}
