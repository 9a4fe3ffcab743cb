use std::fmt::Write;

use crate::models::RewardRange;

/// Builds the fortune-teller instruction for one draw.
///
/// Both bounds are written as plain integers, exactly as configured.
pub fn build_instructions(range: RewardRange) -> String {
    let mut prompt = String::new();

    writeln!(
        prompt,
        "Đóng vai một thầy bói vui tính, hài hước (hoặc một thầy đồ hiện đại) trong dịp Tết Bính Ngọ năm 2026 (Năm con Ngựa). Hãy xem tướng khuôn mặt người trong ảnh để phán một quẻ đầu năm."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(
        prompt,
        "Hãy sáng tạo ra một \"Danh hiệu Tết\" thật kêu và lầy lội liên quan đến con người hoặc con ngựa (ví dụ: \"Chiến Mã Bất Bại\", \"Ngựa Chứng Khó Chiều\", \"Thánh Ăn Chực\", \"Đại Gia Ngầm\")."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "Trả về JSON object tiếng Việt gồm:").unwrap();
    writeln!(prompt, "- title: Danh hiệu Tết 2026 (Hài hước).").unwrap();
    writeln!(
        prompt,
        "- description: Phán về vận mệnh năm mới (Tình duyên, tiền bạc, cân nặng) một cách hài hước. Khoảng 2-3 câu ngắn gọn."
    )
    .unwrap();
    writeln!(
        prompt,
        "- luckyMoney: Số tiền lì xì \"tâm linh\" nên nhận được, chọn ngẫu nhiên từ {} đến {} (định dạng tiền Việt, vd: \"68.000đ\").",
        range.min, range.max
    )
    .unwrap();
    writeln!(
        prompt,
        "- advice: Lời khuyên để sinh tồn qua mấy ngày Tết (vd: cách trốn rửa bát, cách đáp trả khi bị hỏi bao giờ lấy chồng/vợ)."
    )
    .unwrap();
    write!(
        prompt,
        "- strength: Một \"siêu năng lực\" ngày Tết (vd: Phi nước đại về nhà ăn cơm, Bóc hạt dưa tốc độ ánh sáng)."
    )
    .unwrap();

    prompt
}
