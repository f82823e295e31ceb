//! 电子表格导出 - 业务能力层
//!
//! 把"表头 + 数据行"写成单个工作表的 xlsx 字节，与 CSV 导出的列保持一致

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook};

use crate::error::ExportError;

/// 单元格内容
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// 生成只有一个工作表的 xlsx 文件内容，第一行为加粗表头
pub fn sheet_to_xlsx<'a, R>(
    sheet_name: &str,
    headers: &[&str],
    rows: R,
) -> Result<Vec<u8>, ExportError>
where
    R: IntoIterator<Item = Vec<Cell<'a>>>,
{
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col_num(col), *header, &header_format)?;
        }

        for (i, row) in rows.into_iter().enumerate() {
            let row_num = RowNum::try_from(i + 1).unwrap_or(RowNum::MAX);
            for (col, cell) in row.into_iter().enumerate() {
                match cell {
                    Cell::Text(text) => worksheet.write_string(row_num, col_num(col), text)?,
                    Cell::Number(value) => worksheet.write_number(row_num, col_num(col), value)?,
                };
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// 超出列上限时交给写入函数报错
fn col_num(col: usize) -> ColNum {
    ColNum::try_from(col).unwrap_or(ColNum::MAX)
}
