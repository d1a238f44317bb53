use clap::Args;
use pet_care::care::{
    CareError, CareService, DayOfWeek, InMemoryCareStore, InMemoryDirectory, PetId,
    RequestStatus, RequestSubmission, ReviewSummary, SlotInput, UserId, WeeklySlot,
};
use pet_care::error::AppError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the outcome as JSON instead of a readable walkthrough.
    #[arg(long)]
    pub(crate) json: bool,
}

/// What the walkthrough observed at each step.
#[derive(Debug, Serialize)]
pub(crate) struct DemoOutcome {
    pub(crate) availability: Vec<WeeklySlot>,
    pub(crate) first_request_status: RequestStatus,
    pub(crate) booked_walks: Vec<WeeklySlot>,
    pub(crate) second_request_error: Option<String>,
    pub(crate) second_request_status: RequestStatus,
    pub(crate) review: ReviewSummary,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let outcome = walkthrough()?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&outcome)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Pet care scheduling demo");
    println!("Wendy opens: {}", join_slots(&outcome.availability));
    println!(
        "Olivia's request for Biscuit is {}; walks booked: {}",
        outcome.first_request_status,
        join_slots(&outcome.booked_walks)
    );
    println!(
        "Oscar's overlapping request for Pepper stays {}: {}",
        outcome.second_request_status,
        outcome
            .second_request_error
            .as_deref()
            .unwrap_or("no conflict detected")
    );
    let average = outcome
        .review
        .average
        .map(|average| format!("{average:.1}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "Wendy's rating after Olivia's review: {average} from {} review(s)",
        outcome.review.count
    );
    Ok(())
}

fn join_slots(slots: &[WeeklySlot]) -> String {
    slots
        .iter()
        .map(WeeklySlot::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Two Monday-morning slots get booked once, a second owner collides on one
/// of them, and the first owner then rates the caregiver.
pub(crate) fn walkthrough() -> Result<DemoOutcome, AppError> {
    let directory = InMemoryDirectory::new()
        .with_pet("biscuit", Some("olivia"))
        .with_pet("pepper", Some("oscar"))
        .with_caregiver("wendy");
    let store = Arc::new(InMemoryCareStore::new());
    let service = CareService::new(store, Arc::new(directory));

    let wendy = UserId("wendy".to_string());
    let olivia = UserId("olivia".to_string());
    let oscar = UserId("oscar".to_string());
    let mornings = vec![
        SlotInput::new(DayOfWeek::Monday, "09:00"),
        SlotInput::new(DayOfWeek::Monday, "09:15"),
    ];

    let availability = service.put_availability(&wendy, &wendy, &mornings)?;

    let first = service.create_request(
        &wendy,
        &PetId("biscuit".to_string()),
        RequestSubmission {
            kind: "care".to_string(),
            message: Some("Two walks every Monday morning".to_string()),
            slots: mornings,
        },
    )?;
    let acceptance = service.accept(&olivia, &first.id)?;

    let second = service.create_request(
        &wendy,
        &PetId("pepper".to_string()),
        RequestSubmission {
            kind: "care".to_string(),
            message: None,
            slots: vec![SlotInput::new(DayOfWeek::Monday, "09:00")],
        },
    )?;
    let second_request_error = match service.accept(&oscar, &second.id) {
        Ok(_) => None,
        Err(err @ CareError::SlotConflict(_)) => Some(err.to_string()),
        Err(err) => return Err(err.into()),
    };
    let second_request_status = service.request(&oscar, &second.id)?.status;

    let review = service.submit_rating(&olivia, &wendy, 5)?;

    Ok(DemoOutcome {
        availability,
        first_request_status: acceptance.request.status,
        booked_walks: acceptance.walks.iter().map(|walk| walk.slot()).collect(),
        second_request_error,
        second_request_status,
        review,
    })
}
