use std::sync::Arc;

use serde_json::json;
use staybook_core::dates::StayRange;
use staybook_core::domain::property::PropertyId;
use staybook_core::errors::{ApplicationError, InterfaceError};
use staybook_core::gateway::NoopPaymentGateway;
use staybook_db::BookingService;

use crate::commands::{build_runtime, load_config, open_migrated, CommandResult};

#[derive(Clone, Debug)]
pub struct QuoteArgs {
    pub property: String,
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
}

pub fn run(args: QuoteArgs) -> CommandResult {
    let stay = match StayRange::parse(&args.check_in, &args.check_out) {
        Ok(stay) => stay,
        Err(error) => return application_failure(error.into()),
    };
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("quote") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let property_id = PropertyId(args.property.trim().to_owned());
    runtime.block_on(async {
        let pool = match open_migrated(&config).await {
            Ok(pool) => pool,
            Err(failure) => return CommandResult::from_failure("quote", failure),
        };
        let service =
            BookingService::from_config(pool.clone(), Arc::new(NoopPaymentGateway), &config.platform);

        let priced = async {
            let quote = service.quote_stay(&property_id, &stay, args.guests).await?;
            let conflicts = service.check_availability(&property_id, &stay).await?;
            Ok::<_, ApplicationError>((quote, conflicts))
        }
        .await;
        pool.close().await;

        match priced {
            Ok((quote, conflicts)) => {
                let available = conflicts.is_empty();
                let mut message = format!(
                    "{} nights at {} for {} guests: total {} {}",
                    quote.nights, quote.property_id.0, quote.guests, quote.total, quote.currency
                );
                if !available {
                    let reasons = conflicts.iter().map(ToString::to_string).collect::<Vec<_>>();
                    message.push_str(&format!(" (unavailable: {})", reasons.join("; ")));
                }
                CommandResult::success_with_data(
                    "quote",
                    message,
                    Some(json!({ "quote": quote, "available": available, "conflicts": conflicts })),
                )
            }
            Err(error) => application_failure(error),
        }
    })
}

fn application_failure(error: ApplicationError) -> CommandResult {
    let interface = error.into_interface("cli");
    let exit_code = match interface {
        InterfaceError::BadRequest { .. } => 2,
        InterfaceError::NotFound { .. } => 7,
        _ => 8,
    };
    CommandResult::failure("quote", interface.code(), interface.user_message(), exit_code)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{run, QuoteArgs};

    #[test]
    fn malformed_dates_fail_before_touching_the_database() {
        let result = run(QuoteArgs {
            property: "PR-LAKE-1".to_owned(),
            check_in: "2026-01-07".to_owned(),
            check_out: "2026-01-05".to_owned(),
            guests: 1,
        });
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 2);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["error_class"], "VALIDATION_ERROR");
    }
}
