//! Human-readable rendering of an analysis report.

use vigil_core::report::Report;

/// Prints the banner-style summary used when `--json` is not requested.
pub fn print_report(report: &Report) {
    println!("============================================================");
    println!("DELEGATECALL SURFACE ANALYSIS");
    println!("============================================================");
    if let Some(address) = &report.contract_address {
        println!("Contract:                 {address}");
    }
    if let Some(network) = &report.network {
        println!("Network:                  {network}");
    }
    println!("Bytecode hash (sha-256):  {}", report.bytecode_hash);
    println!("Delegatecall sites:       {}", report.delegatecall_count);
    match &report.overall_risk {
        Some(risk) => println!("Overall risk:             {risk}"),
        None => println!("Overall risk:             n/a (no sites)"),
    }

    if !report.proxies_detected.is_empty() {
        println!();
        println!("Detected proxy patterns:");
        for entry in &report.proxies_detected {
            println!("  {:<12} x{}", entry.name.to_string(), entry.count);
        }
    }

    if !report.sites.is_empty() {
        println!();
        println!("Sites:");
        for site in &report.sites {
            let pattern = site
                .pattern
                .as_ref()
                .map(|m| m.name.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  pc 0x{:04x}  {:<10} risk={:<8} pattern={}",
                site.pc,
                site.classification.kind.to_string(),
                site.risk.to_string(),
                pattern
            );
            if let Some(address) = &site.classification.address_literal {
                println!("            target address: {address}");
            }
            if let Some(slot) = &site.classification.storage_slot_literal {
                println!("            storage slot:   {slot}");
            }
            if let Some(details) = &site.classification.details {
                println!("            details:        {details}");
            }
            if let Some(notes) = &site.notes {
                println!("            notes:          {notes}");
            }
        }
    }
    println!("============================================================");
}
