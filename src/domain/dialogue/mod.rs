//! Deterministic dialogue templates.
//!
//! The canned shopkeeper lines used whenever the dialogue model fails,
//! contradicts the engine's price, or is simply not configured. The only
//! number a template ever embeds is the published price, so template
//! output passes the numeric guardrail by construction.

use crate::domain::foundation::Rupees;
use crate::domain::negotiation::{Language, Sentiment, Tactic};

/// Canned shopkeeper line for a tactic, price, and language.
pub fn fallback_message(
    tactic: Tactic,
    price: Rupees,
    language: Language,
    product_name: &str,
) -> String {
    match language {
        Language::En => match tactic {
            Tactic::OpeningAnchor => format!(
                "Welcome! {} is yours for {} rupees. Fine quality, see for yourself.",
                product_name, price
            ),
            Tactic::Accept => format!("Done, {} rupees it is. You bargain well!", price),
            Tactic::Concession => format!(
                "Okay okay, just for you: {} rupees. I am cutting my own margin.",
                price
            ),
            Tactic::AnchorDefense => format!(
                "At that price I cannot even cover the cost. {} rupees is the honest rate.",
                price
            ),
            Tactic::WalkAwaySave => format!(
                "Wait, wait! Don't go. Final special price, {} rupees, only for you.",
                price
            ),
            Tactic::QuantityPivot => format!(
                "On one piece I cannot move. Take two and we will talk, {} rupees each stands.",
                price
            ),
            Tactic::BotBlock => {
                "This haggling does not look right. Come back and talk like a person.".to_string()
            }
            Tactic::Deadline => {
                "We have gone back and forth too long. The deal is off for today.".to_string()
            }
            Tactic::Timeout => {
                "You took too long to decide. Come back and we start fresh.".to_string()
            }
        },
        Language::Hi => match tactic {
            Tactic::OpeningAnchor => format!(
                "Aaiye! {} sirf {} rupaye mein. Quality dekh lijiye pehle.",
                product_name, price
            ),
            Tactic::Accept => {
                format!("Pakka, {} rupaye final. Aap toh mol-bhav ke ustaad ho!", price)
            }
            Tactic::Concession => {
                format!("Accha accha, aapke liye {} rupaye. Margin kaat raha hoon apna.", price)
            }
            Tactic::AnchorDefense => format!(
                "Itne mein toh lagat bhi nahi nikalti bhaiya. {} rupaye sahi daam hai.",
                price
            ),
            Tactic::WalkAwaySave => format!(
                "Arre rukiye! Jaaiye mat. Aakhri daam {} rupaye, sirf aapke liye.",
                price
            ),
            Tactic::QuantityPivot => format!(
                "Ek piece pe nahi ho payega. Do lijiye toh baat banegi, {} rupaye ka bhav wahi hai.",
                price
            ),
            Tactic::BotBlock => {
                "Ye mol-bhav theek nahi lag raha. Insaan ban ke baat kijiye.".to_string()
            }
            Tactic::Deadline => "Bahut ho gaya bhaiya. Aaj ke liye baat khatam.".to_string(),
            Tactic::Timeout => {
                "Aapne bahut time laga diya. Phir se aaiye, nayi shuruaat karenge.".to_string()
            }
        },
        Language::Ta => match tactic {
            Tactic::OpeningAnchor => {
                format!("வாங்க! {} வெறும் {} ரூபாய்தான்.", product_name, price)
            }
            Tactic::Accept => format!("சரி, {} ரூபாய்க்கு முடிவு. நல்லா பேரம் பேசுறீங்க!", price),
            Tactic::Concession => format!("சரி சரி, உங்களுக்காக {} ரூபாய்.", price),
            Tactic::AnchorDefense => {
                format!("அந்த விலைக்கு முடியாது. {} ரூபாய்தான் நியாயமான விலை.", price)
            }
            Tactic::WalkAwaySave => {
                format!("போகாதீங்க! கடைசி விலை {} ரூபாய், உங்களுக்கு மட்டும்.", price)
            }
            Tactic::QuantityPivot => {
                format!("ஒன்றுக்கு குறைக்க முடியாது. இரண்டு வாங்கினால் பேசலாம், {} ரூபாய்.", price)
            }
            Tactic::BotBlock => "இந்த பேரம் சரியா தெரியலை. நேரில் வந்து பேசுங்க.".to_string(),
            Tactic::Deadline => "ரொம்ப நேரம் ஆச்சு. இன்றைக்கு வியாபாரம் முடிந்தது.".to_string(),
            Tactic::Timeout => "நேரம் முடிந்துவிட்டது. மறுபடியும் வாங்க.".to_string(),
        },
        Language::Te => match tactic {
            Tactic::OpeningAnchor => format!("రండి! {} కేవలం {} రూపాయలు.", product_name, price),
            Tactic::Accept => format!("సరే, {} రూపాయలకు ఒప్పందం. బాగా బేరమాడారు!", price),
            Tactic::Concession => format!("సరే సరే, మీ కోసం {} రూపాయలు.", price),
            Tactic::AnchorDefense => format!("ఆ ధరకు ఇవ్వలేను. {} రూపాయలే సరైన ధర.", price),
            Tactic::WalkAwaySave => format!("ఆగండి! చివరి ధర {} రూపాయలు, మీ కోసమే.", price),
            Tactic::QuantityPivot => {
                format!("ఒక్కదానికి తగ్గించలేను. రెండు తీసుకుంటే చూద్దాం, {} రూపాయలు.", price)
            }
            Tactic::BotBlock => "ఈ బేరం సరిగ్గా లేదు. మనిషిలా మాట్లాడండి.".to_string(),
            Tactic::Deadline => "చాలా సేపు అయ్యింది. ఈరోజుకి బేరం ముగిసింది.".to_string(),
            Tactic::Timeout => "సమయం ముగిసింది. మళ్ళీ రండి.".to_string(),
        },
        Language::Mr => match tactic {
            Tactic::OpeningAnchor => format!("या! {} फक्त {} रुपयांत.", product_name, price),
            Tactic::Accept => format!("ठरलं, {} रुपये पक्के. छान घासाघीस करता तुम्ही!", price),
            Tactic::Concession => format!("बरं बरं, तुमच्यासाठी {} रुपये.", price),
            Tactic::AnchorDefense => {
                format!("त्या किमतीत परवडत नाही. {} रुपये हाच योग्य भाव.", price)
            }
            Tactic::WalkAwaySave => {
                format!("थांबा! शेवटची किंमत {} रुपये, फक्त तुमच्यासाठी.", price)
            }
            Tactic::QuantityPivot => {
                format!("एकावर कमी होणार नाही. दोन घ्या मग बघू, {} रुपये.", price)
            }
            Tactic::BotBlock => "ही घासाघीस बरोबर वाटत नाही. माणसासारखं बोला.".to_string(),
            Tactic::Deadline => "खूप वेळ झाला. आजचा व्यवहार संपला.".to_string(),
            Tactic::Timeout => "वेळ संपली. पुन्हा या.".to_string(),
        },
    }
}

/// Sentiment a template line carries for each tactic.
pub fn template_sentiment(tactic: Tactic) -> Sentiment {
    match tactic {
        Tactic::OpeningAnchor | Tactic::Accept | Tactic::WalkAwaySave => Sentiment::Warm,
        Tactic::Concession | Tactic::QuantityPivot => Sentiment::Neutral,
        Tactic::AnchorDefense | Tactic::BotBlock | Tactic::Deadline | Tactic::Timeout => {
            Sentiment::Firm
        }
    }
}
