/// Centralized error mapping for commands.
///
/// The front-end receives the message with its cause chain, e.g.
/// `"failed to bind 0.0.0.0:1699: permission denied"`.
pub fn map_err<E>(err: E) -> String
where
    E: Into<anyhow::Error>,
{
    format!("{:#}", err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_map_err_keeps_cause_chain() {
        let err = Err::<(), _>(std::io::Error::other("socket closed"))
            .context("broadcast failed")
            .unwrap_err();

        assert_eq!(map_err(err), "broadcast failed: socket closed");
    }
}
