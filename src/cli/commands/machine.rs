//! Machine inventory command handlers

use crate::domain::MachineState;
use crate::state::SharedState;

use super::console_actor;

pub async fn cmd_machine_add(state: &SharedState, ip: &str) -> anyhow::Result<()> {
    let ip = state.occupancy.add_machine(&console_actor(), ip).await?;
    println!("✓ Added {ip}");
    Ok(())
}

pub async fn cmd_machine_remove(state: &SharedState, ip: &str) -> anyhow::Result<()> {
    if state.occupancy.remove_machine(&console_actor(), ip).await? {
        println!("✓ Removed {}", ip.trim());
    } else {
        println!("{} is not registered.", ip.trim());
    }
    Ok(())
}

pub async fn cmd_machine_list(state: &SharedState) -> anyhow::Result<()> {
    let machines = state.occupancy.list_machines().await?;

    if machines.is_empty() {
        println!("No machines registered.");
        println!();
        println!("Add one with: labtrack machine add <ip>");
        return Ok(());
    }

    println!("Machines ({} total)", machines.len());
    println!("{:-<70}", "");

    for machine in machines {
        match &machine.state {
            MachineState::Free => println!("{:<16} free", machine.ip),
            MachineState::Occupied(occupancy) => {
                let occupant = machine
                    .occupant_name
                    .as_deref()
                    .unwrap_or(&occupancy.occupant);
                let released = if occupancy.main_released {
                    " (occupant left)"
                } else {
                    ""
                };
                println!(
                    "{:<16} occupied by {}{} | {} | {}h since {}",
                    machine.ip,
                    occupant,
                    released,
                    occupancy.project,
                    occupancy.duration_hours,
                    occupancy.started_at.format("%Y-%m-%d %H:%M UTC")
                );
                for c in &machine.contributors {
                    println!(
                        "  + {} | {} | {}h",
                        c.name, c.contribution.project, c.contribution.duration_hours
                    );
                }
            }
        }
    }

    Ok(())
}
