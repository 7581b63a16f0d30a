use rocket::fairing::AdHoc;

pub mod gift;
pub mod paypal_guest;
pub mod vote;

pub fn mount() -> AdHoc {
    AdHoc::on_ignite("Attaching Routes", |rocket| async {
        rocket.mount(
            "/",
            routes![
                gift::wallet_gift,
                paypal_guest::confirm_guest_capture,
                vote::initiate_payment,
                vote::verify_paypal,
                vote::verify_paystack,
                vote::wallet_vote
            ],
        )
    })
}
