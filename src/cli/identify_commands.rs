use crate::cli::context::CLIContext;
use crate::error::{IdrecError, IdrecResult};
use crate::model::{ContactId, IdentifyRequest};

pub fn identify(ctx: &CLIContext, args: &str) {
    let request = match parse_identify_args(args) {
        Ok(r) => r,
        Err(e) => {
            ctx.print_error(&e);
            return;
        }
    };

    match ctx.store.identify(&request) {
        Ok(response) => ctx.print_json(&response),
        Err(e) => ctx.print_error(&e),
    }
}

pub fn show(ctx: &CLIContext, args: &str) {
    let id = match parse_contact_id(args) {
        Ok(id) => id,
        Err(e) => {
            ctx.print_error(&e);
            return;
        }
    };

    match ctx.store.identity_for(id) {
        Ok(Some(identity)) => ctx.print_json(&identity),
        Ok(None) => println!("No active contact with id {}", id),
        Err(e) => ctx.print_error(&e),
    }
}

pub fn delete(ctx: &CLIContext, args: &str) {
    let id = match parse_contact_id(args) {
        Ok(id) => id,
        Err(e) => {
            ctx.print_error(&e);
            return;
        }
    };

    match ctx.store.soft_delete(id) {
        Ok(()) => println!("Deleted contact {}", id),
        Err(e) => ctx.print_error(&e),
    }
}

pub fn print_stats(ctx: &CLIContext) {
    match ctx.store.stats() {
        Ok(stats) => {
            println!("Identities:       {}", stats.identities);
            println!("Secondary links:  {}", stats.secondaries);
            println!("Active contacts:  {}", stats.active_contacts);
            println!("Deleted contacts: {}", stats.deleted_contacts);
        }
        Err(e) => ctx.print_error(&e),
    }
}

/// Accepts either a JSON body (`{"email": "...", "phoneNumber": "..."}`) or
/// `key=value` pairs with keys `email` and `phone`/`phoneNumber`.
pub fn parse_identify_args(args: &str) -> IdrecResult<IdentifyRequest> {
    let args = args.trim();
    if args.starts_with('{') {
        return Ok(serde_json::from_str(args)?);
    }

    let mut request = IdentifyRequest::default();
    for pair in args.split_whitespace() {
        let (key, value) = pair.split_once('=').ok_or_else(|| IdrecError::InvalidRequest {
            reason: format!("expected key=value, got `{}`", pair),
        })?;
        match key {
            "email" => request.email = Some(value.to_string()),
            "phone" | "phoneNumber" => request.phone_number = Some(value.to_string()),
            other => {
                return Err(IdrecError::InvalidRequest {
                    reason: format!("unknown field `{}`", other),
                })
            }
        }
    }
    Ok(request)
}

fn parse_contact_id(args: &str) -> IdrecResult<ContactId> {
    ContactId::parse(args).map_err(|_| IdrecError::InvalidRequest {
        reason: format!("expected a contact id, got `{}`", args.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        let request = parse_identify_args("email=a@x.com phone=123").unwrap();
        assert_eq!(request, IdentifyRequest::new(Some("a@x.com"), Some("123")));
    }

    #[test]
    fn parses_phone_number_alias() {
        let request = parse_identify_args("phoneNumber=555").unwrap();
        assert_eq!(request, IdentifyRequest::new(None, Some("555")));
    }

    #[test]
    fn parses_json_body() {
        let request = parse_identify_args(r#"{"email": "a@x.com", "phoneNumber": 123456}"#).unwrap();
        assert_eq!(request, IdentifyRequest::new(Some("a@x.com"), Some("123456")));
    }

    #[test]
    fn rejects_unknown_field() {
        assert!(parse_identify_args("name=alice").is_err());
    }

    #[test]
    fn rejects_bare_word() {
        assert!(parse_identify_args("alice").is_err());
    }

    #[test]
    fn empty_args_give_empty_request() {
        assert_eq!(parse_identify_args("").unwrap(), IdentifyRequest::default());
    }

    #[test]
    fn contact_id_must_be_numeric() {
        assert!(parse_contact_id("x1").is_err());
        assert_eq!(parse_contact_id(" 3 ").unwrap(), ContactId::new(3));
    }
}
