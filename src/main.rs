use anyhow::Result;
use colored::Colorize;
use options_scanner::models::{FilterCriteria, ScoredCandidate};
use options_scanner::{FileProvider, ScanError, Scanner, StrategyId, config, logging};

fn main() -> Result<()> {
    logging::init_logging();

    println!("{}", "=".repeat(60).blue());
    println!("{}", "Options Strategy Scanner".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let symbol = config::get_symbol();
    let strategy: StrategyId = config::get_strategy().parse()?;
    let mode = config::get_execution_mode();

    println!(
        "{} Symbol: {}  Strategy: {}",
        "ℹ".blue(),
        symbol.yellow(),
        strategy.display_name().yellow()
    );
    println!("{} Chain snapshot: {}", "ℹ".blue(), config::get_chain_file());
    println!();

    let provider = FileProvider::new(config::get_chain_file());
    let scanner = Scanner::new(Box::new(provider))
        .with_risk_free_rate(config::get_risk_free_rate())
        .with_top_n(config::get_top_n());

    println!("{}", "Step 1: Scanning for opportunities...".cyan());
    match scanner.scan(&symbol, strategy, &FilterCriteria::default()) {
        Ok(results) => {
            println!("{} Found {} opportunities", "✓".green(), results.len());
            println!();
            print_results(&results);
        }
        Err(ScanError::NoCandidatesFound { .. }) => {
            println!("{} No opportunities matched all criteria", "✗".red());
        }
        Err(err) => return Err(err.into()),
    }

    if mode == "report" {
        println!();
        println!("{}", "Step 2: Funnel report".cyan());
        print_funnel(&scanner, strategy);
    }

    Ok(())
}

fn print_results(results: &[ScoredCandidate]) {
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{} score {:.2}  net {:+.2}  max profit {}  max loss {}  pop {:.1}%",
            format!("#{}", rank + 1).green().bold(),
            result.score,
            result.metrics.net_debit_credit,
            result.metrics.max_profit,
            result.metrics.max_loss,
            result.metrics.prob_profit_pct,
        );
        for leg in &result.candidate.legs {
            let mult = if leg.multiplier > 1 { format!(" x{}", leg.multiplier) } else { String::new() };
            println!(
                "    {:?} {:?}{} {:.2} exp {} @ {:.2}",
                leg.side,
                leg.contract.option_type,
                mult,
                leg.contract.strike,
                leg.contract.expiry,
                leg.contract.premium,
            );
        }
        if !result.metrics.breakevens.is_empty() {
            let bes: Vec<String> =
                result.metrics.breakevens.iter().map(|b| format!("{:.2}", b)).collect();
            println!("    breakevens: {}", bes.join(", ").yellow());
        }
    }
}

fn print_funnel(scanner: &Scanner, strategy: StrategyId) {
    let Some(report) = scanner.pipeline_report(strategy) else {
        println!("{} No pipeline report recorded", "✗".red());
        return;
    };
    for step in &report.steps {
        println!(
            "  {:>2}. {:<18} {:>6} → {:>6}  ({:>5.1}%)  {}",
            step.step,
            step.name,
            step.input_count,
            step.passed_count,
            step.pass_rate,
            step.description.dimmed(),
        );
    }
    println!(
        "  {} {} of {} candidates survived ({:.2}%) in {}ms",
        "Σ".blue(),
        report.summary.final_output,
        report.summary.total_input,
        report.summary.overall_pass_rate,
        report.summary.scan_duration_ms,
    );
}
