use rust_decimal::Decimal;
use tradeportal_core::{Currency, SystemSettings, TransferDirection, TransferInstruction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("Main account ID is not configured for {0}")]
    MissingMainAccount(Currency),
    #[error("Main account user ID is not configured for {0}")]
    MissingMainUser(Currency),
}

/// Resolve sender and receiver for a transfer between a customer and the
/// house account of their currency.
///
/// Deposit-style transfers go from the main-account user to the customer's
/// account; withdrawal-style transfers go from the customer to the main
/// account.
pub fn route_transfer(
    direction: TransferDirection,
    currency: Currency,
    user_vendor_id: i64,
    user_account_id: i64,
    amount: Decimal,
    settings: &SystemSettings,
) -> Result<TransferInstruction, RouteError> {
    let house = settings.currency(currency);
    let (sender_user_id, receiver_account_id) = match direction {
        TransferDirection::Deposit => {
            let main_user = house
                .and_then(|c| c.main_user_id)
                .ok_or(RouteError::MissingMainUser(currency))?;
            (main_user, user_account_id)
        }
        TransferDirection::Withdrawal => {
            let main_account = house
                .and_then(|c| c.main_account_id)
                .ok_or(RouteError::MissingMainAccount(currency))?;
            (user_vendor_id, main_account)
        }
    };

    Ok(TransferInstruction {
        sender_user_id,
        receiver_account_id,
        amount,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::full_settings;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deposit_sends_from_main_user() {
        let t = route_transfer(
            TransferDirection::Deposit,
            Currency::Usd,
            7001,
            1001,
            dec!(100),
            &full_settings(),
        )
        .unwrap();
        assert_eq!(t.sender_user_id, 50);
        assert_eq!(t.receiver_account_id, 1001);
    }

    #[test]
    fn test_withdrawal_pays_main_account() {
        let t = route_transfer(
            TransferDirection::Withdrawal,
            Currency::Inr,
            7001,
            2001,
            dec!(100),
            &full_settings(),
        )
        .unwrap();
        assert_eq!(t.sender_user_id, 7001);
        assert_eq!(t.receiver_account_id, 600);
    }

    #[test]
    fn test_missing_main_account() {
        let err = route_transfer(
            TransferDirection::Withdrawal,
            Currency::Usd,
            1,
            2,
            dec!(1),
            &SystemSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, RouteError::MissingMainAccount(Currency::Usd));
    }
}
