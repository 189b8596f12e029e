use serde::Serialize;

/// JSON body of every non-2xx answer.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Snake-case error class, e.g. `not_found`.
    pub name: &'static str,
    pub message: String,
    /// Field or resource the error is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use crate::handler::Error;

    #[test]
    fn body_leaves_out_detail() -> anyhow::Result<()> {
        let body = Error::unavailable("Token store unreachable")
            .with_resource("progress")
            .with_detail("nats: no responders")
            .to_body();

        let json = serde_json::to_value(&body)?;
        assert_eq!(json["name"], "service_unavailable");
        assert_eq!(json["resource"], "progress");
        assert_eq!(json.as_object().map(|o| o.len()), Some(3));
        assert!(!json.to_string().contains("no responders"));
        Ok(())
    }

    #[test]
    fn resource_is_omitted_when_absent() -> anyhow::Result<()> {
        let json = serde_json::to_value(Error::internal().to_body())?;
        assert_eq!(json["message"], "Internal server error.");
        assert!(json.get("resource").is_none());
        Ok(())
    }
}
