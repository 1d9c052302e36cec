use colored::*;
use devsplit_core::analysis::{ConflictPlan, ReassignmentGroup};
use devsplit_core::DeviceEngine;

const SAMPLE_POINTS: usize = 5;

/// Indented folder tree. Hidden folders are shown collapsed.
pub fn print_tree(engine: &DeviceEngine) {
    let mut collapsed_at: Option<usize> = None;

    for (depth, node) in engine.tree().walk() {
        if let Some(limit) = collapsed_at {
            if depth > limit {
                continue;
            }
            collapsed_at = None;
        }

        let hidden = engine.hidden_folders().contains(&node.path);
        let mut line = format!(
            "{}{} {}",
            "  ".repeat(depth),
            node.name,
            format!("({})", node.point_count).dimmed()
        );
        if engine.devices().contains(&node.path) {
            let label = format!("[device: {}]", engine.display_name(&node.path));
            line.push_str(&format!(" {}", label.green()));
        }
        if hidden {
            line.push_str(&format!(" {}", "[hidden]".yellow()));
            collapsed_at = Some(depth);
        }
        println!("{}", line);
    }
}

pub fn print_devices(engine: &DeviceEngine) {
    let summaries = engine.device_summaries();
    if summaries.is_empty() {
        println!("No devices");
    }
    for summary in &summaries {
        let merged = match &summary.merged_id {
            Some(id) => format!(" merged:{}", id).cyan().to_string(),
            None => String::new(),
        };
        println!(
            "{}  {}  {}{}",
            summary.display_name.bold(),
            summary.path,
            format!("{} points", summary.point_count).dimmed(),
            merged
        );
    }

    if !engine.merged_devices().is_empty() {
        println!();
        println!("{}", "Merged devices".underline());
        for group in engine.merged_devices() {
            println!(
                "{}  {}  [{}]",
                group.id.cyan(),
                group.name.bold(),
                group.member_paths.join(", ")
            );
        }
    }
}

pub fn print_plan(engine: &DeviceEngine, plan: &ConflictPlan) {
    for path in &plan.to_add {
        println!("{} {}", "+".green(), path);
    }
    for path in &plan.to_remove {
        println!("{} {} ({})", "-".red(), path, engine.display_name(path));
    }
    for path in &plan.dropped_from_selection {
        println!(
            "{} {} (contains another selected folder)",
            "~".yellow(),
            path
        );
    }
    for conflict in &plan.upstream_conflicts {
        println!(
            "  {} {} contains {}",
            "upstream".red(),
            conflict.existing,
            conflict.candidate
        );
    }
    for conflict in &plan.downstream_conflicts {
        println!(
            "  {} {} is inside {}",
            "downstream".red(),
            conflict.existing,
            conflict.candidate
        );
    }

    for group in &plan.reassignments {
        println!("{}", reassignment_heading(engine, group).bold());
        for point in group.points.iter().take(SAMPLE_POINTS) {
            println!("    {}", point.dimmed());
        }
        if group.points.len() > SAMPLE_POINTS {
            println!("    {}", format!("... {} more", group.points.len() - SAMPLE_POINTS).dimmed());
        }
    }
}

/// Both ends are shown by display name.
fn reassignment_heading(engine: &DeviceEngine, group: &ReassignmentGroup) -> String {
    format!(
        "{} → {}: {} points move",
        engine.display_name(&group.from),
        engine.display_name(&group.to),
        group.points.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsplit_core::records::PointRecord;
    use devsplit_core::{PlanOutcome, SilentReporter};

    #[test]
    fn test_reassignment_heading_uses_display_names() {
        let mut engine = DeviceEngine::new("root");
        let points = ["root/AHU$201/fan/1", "root/AHU$201/fan/2", "root/AHU$201/3"]
            .iter()
            .map(|p| PointRecord::new(p, "Points", "root"))
            .collect();
        engine.load_points(points, &SilentReporter);
        engine.propose_devices(["root/AHU$201"], &SilentReporter);
        engine.set_name_override("root/AHU$201", "Air Handler");

        let plan = match engine.propose_devices(["root/AHU$201/fan"], &SilentReporter) {
            PlanOutcome::AwaitingConfirmation(plan) => plan,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(
            reassignment_heading(&engine, &plan.reassignments[0]),
            "Air Handler → fan: 2 points move"
        );
    }
}
