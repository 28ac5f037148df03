use anyhow::Result;
use chrono::Local;
use replyflow_core::config::AppConfig;
use replyflow_core::rule::{ReplyVariables, RuleEngine, TemplateContext, render};

/// Runs `message` through an account's rules without sending anything.
pub fn execute(config: &AppConfig, account: Option<&str>, message: &str) -> Result<()> {
    let account = config.resolve_account(account)?;
    let settings = config.account_settings(account)?;
    let target = settings
        .monitor_targets
        .first()
        .cloned()
        .unwrap_or_default();

    let engine = RuleEngine::with_seed(settings.rules, settings.session.random_seed);
    let context = preview_context(&settings.name, &target, message);
    println!("{}", describe(&engine, message, &context));
    Ok(())
}

/// Variables as a session would see them for a target without a contact
/// remark.
fn preview_context(account: &str, target: &str, message: &str) -> TemplateContext {
    ReplyVariables {
        account,
        target,
        sender_name: target,
        content: message,
    }
    .to_context(&Local::now())
}

fn describe(engine: &RuleEngine, message: &str, context: &TemplateContext) -> String {
    let result = engine.process_message(message);
    let (Some(rule), Some(index)) = (result.rule.as_ref(), result.rule_index) else {
        return format!("No rule matched ({} active rule(s)).", engine.active_rule_count());
    };

    let (min, max) = engine.delay_calculator().delay_range(rule);
    let mut out = format!("Matched rule #{index}");
    if let Some(description) = rule.description() {
        out.push_str(&format!(" ({description})"));
    }
    out.push('\n');
    if let Some(pattern) = &result.matched_pattern {
        out.push_str(&format!("Pattern: {pattern}\n"));
    }
    out.push_str(&format!("Delay: {min:.1}s - {max:.1}s\n"));
    out.push_str(&format!("Reply: {}", render(rule.reply_template(), context)));
    out
}
