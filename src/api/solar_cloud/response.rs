use serde::Deserialize;

use crate::prelude::*;

const SUCCESS: i32 = 200;

/// Generic envelope wrapping every SolarCloud payload.
#[derive(Deserialize)]
pub struct Response<R> {
    code: i32,

    #[serde(rename = "msg")]
    message: Option<String>,

    data: Option<R>,
}

impl<R> From<Response<R>> for crate::prelude::Result<R> {
    fn from(response: Response<R>) -> Self {
        if response.code != SUCCESS {
            if let Some(message) = response.message {
                bail!(r#"SolarCloud error {code} ("{message}")"#, code = response.code);
            }
            bail!("SolarCloud error {code}", code = response.code);
        }
        response.data.context("the response is missing `data`")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() -> Result {
        // language=JSON
        let response: Response<Vec<i32>> =
            serde_json::from_str(r#"{"code": 200, "msg": "Success", "data": [1, 2]}"#)?;
        assert_eq!(Result::from(response)?, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_error_code() -> Result {
        // language=JSON
        let response: Response<Vec<i32>> =
            serde_json::from_str(r#"{"code": 6005, "msg": "Invalid signature", "data": null}"#)?;
        let error = Result::from(response).unwrap_err();
        assert!(error.to_string().contains("6005"));
        assert!(error.to_string().contains("Invalid signature"));
        Ok(())
    }

    #[test]
    fn test_missing_data() -> Result {
        // language=JSON
        let response: Response<Vec<i32>> = serde_json::from_str(r#"{"code": 200}"#)?;
        assert!(Result::from(response).is_err());
        Ok(())
    }
}
