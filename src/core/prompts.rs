//! Fixed phrases spoken on behalf of the office.

use crate::config::Office;

/// Opening line spoken when the call connects
pub fn greeting(office: &Office) -> String {
    format!("Hello! Welcome to {}. How may I help you today?", office.name)
}

/// Spoken after the caller says goodbye, right before disconnecting
pub fn closing(office: &Office) -> String {
    format!("Thank you for calling {}. Have a great day!", office.name)
}

pub const RECORDED: &str =
    "Thank you for providing the information. I have saved it. Now I will check if the doctor is available.";

pub fn availability(office: &Office) -> String {
    format!(
        "Doctor {} is available for appointment during your requested time. Should I book the appointment?",
        office.doctor
    )
}

pub fn booked(office: &Office) -> String {
    format!(
        "Appointment booked successfully! I'll send you a confirmation email with all the details. \
         Thank you for choosing {}. Goodbye!",
        office.name
    )
}

/// Instructions handed to the language model driving the conversation
pub fn system_prompt(office: &Office) -> String {
    format!(
        "You are a medical office assistant at {} responsible for booking appointments for patients. \
         Before booking an appointment, you need to collect the following information from patients: \
         full name, date of birth, insurance details, referral information, chief complaint/reason for visit, \
         address, phone number, and email. \
         Use the record_patient_info function to save this information as soon as you have collected it. \
         Be professional, courteous, and guide the conversation naturally to collect all required information. \
         Use short and clear questions, and confirm information when received. \
         After collecting all information, use check_doctor_availability for the patient's preferred time. \
         After the patient confirms, use book_appointment.",
        office.name
    )
}
